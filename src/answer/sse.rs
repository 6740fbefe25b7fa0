//! Server-sent-event decoding for the streaming completion endpoint.
//!
//! The stream is newline-delimited `data: {...}` lines, each carrying an
//! incremental token in `choices[0].delta.content`, terminated by a literal
//! `data: [DONE]` line.

use serde_json::Value;

/// One decoded stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// An incremental answer token.
    Token(String),
    /// End-of-stream marker.
    Done,
}

/// Decode a single stream line.
///
/// Lines without a `data:` prefix, keep-alive blanks, and fragments without
/// a delta token all decode to `None`.
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed == "data: [DONE]" {
        return Some(StreamEvent::Done);
    }

    let payload = trimmed.strip_prefix("data:")?.trim_start();
    let value: Value = serde_json::from_str(payload).ok()?;

    value["choices"][0]["delta"]["content"]
        .as_str()
        .map(|token| StreamEvent::Token(token.to_string()))
}

/// Reassembles complete lines from arbitrarily-split byte chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and return the complete lines it finishes.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(bytes));

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }

    /// Return whatever is left after the stream ends.
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_line(content: &str) -> String {
        format!(
            r#"data: {{"choices":[{{"delta":{{"content":"{}"}}}}]}}"#,
            content
        )
    }

    #[test]
    fn test_three_tokens_then_done() {
        let lines = [
            token_line("Hello"),
            token_line(" world"),
            token_line("!"),
            "data: [DONE]".to_string(),
        ];

        let mut answer = String::new();
        let mut terminal_events = 0;

        for line in &lines {
            match decode_line(line) {
                Some(StreamEvent::Token(token)) => answer.push_str(&token),
                Some(StreamEvent::Done) => terminal_events += 1,
                None => {}
            }
        }

        assert_eq!(answer, "Hello world!");
        assert_eq!(terminal_events, 1);
    }

    #[test]
    fn test_ignores_blank_and_unrelated_lines() {
        assert_eq!(decode_line(""), None);
        assert_eq!(decode_line(": keep-alive"), None);
        assert_eq!(decode_line(r#"data: {"choices":[{"delta":{}}]}"#), None);
    }

    #[test]
    fn test_line_buffer_reassembles_split_chunks() {
        let mut buffer = LineBuffer::new();

        let first = buffer.push(b"data: [DO");
        assert!(first.is_empty());

        let second = buffer.push(b"NE]\ndata: tail");
        assert_eq!(second, vec!["data: [DONE]".to_string()]);

        assert_eq!(buffer.finish(), Some("data: tail".to_string()));
    }

    #[test]
    fn test_line_buffer_strips_carriage_returns() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"data: [DONE]\r\n");
        assert_eq!(lines, vec!["data: [DONE]".to_string()]);
    }
}
