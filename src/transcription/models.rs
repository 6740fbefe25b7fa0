//! Data models for transcription.

use serde::{Deserialize, Serialize};

/// A single timestamped transcript segment.
///
/// `text` carries the translated text when a translation pass produced one
/// for this position, otherwise the original-language text. Both raw
/// variants are retained. The episode number serializes as `Number` to match
/// the stored document format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Video title.
    pub title: String,
    /// Episode number.
    #[serde(rename = "Number")]
    pub number: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Preferred text (translated when available, original otherwise).
    pub text: String,
    /// Original-language text.
    pub original_text: String,
    /// Translated text, empty when no translation covered this segment.
    pub translated_text: String,
}

/// One timestamped segment as produced by the speech-to-text tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Segment text.
    pub text: String,
}

/// The result of one transcription pass over one audio file.
#[derive(Debug, Clone)]
pub struct TranscriptionPass {
    /// Full transcript text.
    pub text: String,
    /// Timestamped segments.
    pub segments: Vec<RawSegment>,
}

/// The per-audio-file transcript document written to the json directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptDocument {
    /// Full original-language transcript.
    pub original_text: String,
    /// Full translated transcript, empty when translation was not requested.
    pub translated_text: String,
    /// Timestamped segments.
    pub chunks: Vec<Segment>,
}

impl TranscriptDocument {
    /// Assemble a document from an original pass and an optional translation
    /// pass.
    ///
    /// The two passes decode independently, so their segment counts can
    /// differ. Only the overlapping index range receives translated text;
    /// segments past the end of the translation keep the original text as
    /// fallback. Segments whose original text is empty after trimming are
    /// dropped.
    pub fn from_passes(
        title: &str,
        number: &str,
        original: TranscriptionPass,
        translated: Option<TranscriptionPass>,
    ) -> Self {
        let translated_segments = translated
            .as_ref()
            .map(|p| p.segments.as_slice())
            .unwrap_or(&[]);

        let mut chunks = Vec::with_capacity(original.segments.len());

        for (i, segment) in original.segments.iter().enumerate() {
            let original_text = segment.text.trim().to_string();
            if original_text.is_empty() {
                continue;
            }

            let translated_text = translated_segments
                .get(i)
                .map(|s| s.text.trim().to_string())
                .unwrap_or_default();

            let text = if translated_text.is_empty() {
                original_text.clone()
            } else {
                translated_text.clone()
            };

            chunks.push(Segment {
                title: title.to_string(),
                number: number.to_string(),
                start: segment.start,
                end: segment.end,
                text,
                original_text,
                translated_text,
            });
        }

        Self {
            original_text: original.text.trim().to_string(),
            translated_text: translated
                .map(|p| p.text.trim().to_string())
                .unwrap_or_default(),
            chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(texts: &[&str]) -> TranscriptionPass {
        TranscriptionPass {
            text: texts.join(" "),
            segments: texts
                .iter()
                .enumerate()
                .map(|(i, t)| RawSegment {
                    start: i as f64 * 5.0,
                    end: (i + 1) as f64 * 5.0,
                    text: t.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_prefers_translated_text() {
        let doc = TranscriptDocument::from_passes(
            "Intro",
            "1",
            pass(&["hola", "mundo"]),
            Some(pass(&["hello", "world"])),
        );

        assert_eq!(doc.chunks.len(), 2);
        assert_eq!(doc.chunks[0].text, "hello");
        assert_eq!(doc.chunks[0].original_text, "hola");
        assert_eq!(doc.chunks[0].translated_text, "hello");
    }

    #[test]
    fn test_mismatched_counts_fall_back_to_original() {
        // Translation decoded fewer segments than the original pass.
        let doc = TranscriptDocument::from_passes(
            "Intro",
            "1",
            pass(&["uno", "dos", "tres"]),
            Some(pass(&["one", "two"])),
        );

        assert_eq!(doc.chunks.len(), 3);
        assert_eq!(doc.chunks[0].text, "one");
        assert_eq!(doc.chunks[1].text, "two");
        assert_eq!(doc.chunks[2].text, "tres");
        assert_eq!(doc.chunks[2].translated_text, "");
    }

    #[test]
    fn test_empty_segments_dropped() {
        let doc = TranscriptDocument::from_passes(
            "Intro",
            "1",
            pass(&["first", "   ", "third"]),
            None,
        );

        assert_eq!(doc.chunks.len(), 2);
        assert_eq!(doc.chunks[0].text, "first");
        assert_eq!(doc.chunks[1].text, "third");
    }

    #[test]
    fn test_number_serializes_capitalized() {
        let doc = TranscriptDocument::from_passes("Intro", "7", pass(&["hi"]), None);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["chunks"][0]["Number"], "7");
    }
}
