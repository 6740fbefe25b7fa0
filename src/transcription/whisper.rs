//! Whisper CLI transcription backend.
//!
//! Shells out to the `whisper` command-line tool, asking for JSON output in
//! a scratch directory and parsing the timestamped segments from it.

use super::{RawSegment, Task, Transcriber, TranscriptionPass};
use crate::error::{LektorError, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Transcriber backed by the external `whisper` CLI.
pub struct WhisperCliTranscriber {
    binary: String,
    model: String,
    device: Option<String>,
}

impl WhisperCliTranscriber {
    /// Create a transcriber with the default binary and model.
    pub fn new() -> Self {
        Self::with_config("whisper", "small", None)
    }

    /// Create a transcriber with a specific binary, model size, and device.
    pub fn with_config(binary: &str, model: &str, device: Option<&str>) -> Self {
        Self {
            binary: binary.to_string(),
            model: model.to_string(),
            device: device.map(|d| d.to_string()),
        }
    }

    /// The model size this transcriber loads.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Default for WhisperCliTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON document the whisper CLI writes next to its other output formats.
#[derive(Debug, Deserialize)]
struct WhisperJson {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<WhisperJsonSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperJsonSegment {
    start: f64,
    end: f64,
    text: String,
}

#[async_trait::async_trait]
impl Transcriber for WhisperCliTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(
        &self,
        audio_path: &Path,
        task: Task,
        language: Option<&str>,
    ) -> Result<TranscriptionPass> {
        let scratch = tempfile::tempdir()?;

        let mut command = Command::new(&self.binary);
        command
            .arg(audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--task")
            .arg(match task {
                Task::Transcribe => "transcribe",
                Task::Translate => "translate",
            })
            .arg("--output_format")
            .arg("json")
            .arg("--output_dir")
            .arg(scratch.path())
            .arg("--verbose")
            .arg("False");

        if let Some(device) = &self.device {
            command.arg("--device").arg(device);
        }
        if let Some(lang) = language {
            command.arg("--language").arg(lang);
        }

        debug!("Running {} for {:?}", self.binary, audio_path);

        let result = command
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LektorError::ToolNotFound(self.binary.clone()));
            }
            Err(e) => {
                return Err(LektorError::Transcription(format!(
                    "{} execution failed: {}",
                    self.binary, e
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LektorError::Transcription(format!(
                "{} failed for {:?}: {}",
                self.binary, audio_path, stderr
            )));
        }

        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let json_path = scratch.path().join(format!("{}.json", stem));

        let content = std::fs::read_to_string(&json_path).map_err(|e| {
            LektorError::Transcription(format!(
                "{} produced no JSON output for {:?}: {}",
                self.binary, audio_path, e
            ))
        })?;

        let parsed: WhisperJson = serde_json::from_str(&content).map_err(|e| {
            LektorError::Transcription(format!("Invalid transcription output: {}", e))
        })?;

        debug!("Transcribed {} segments", parsed.segments.len());

        Ok(TranscriptionPass {
            text: parsed.text,
            segments: parsed
                .segments
                .into_iter()
                .map(|s| RawSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcriber_config() {
        let transcriber = WhisperCliTranscriber::with_config("whisper", "medium", Some("cuda"));
        assert_eq!(transcriber.model(), "medium");
        assert_eq!(transcriber.device.as_deref(), Some("cuda"));
    }

    #[test]
    fn test_parses_whisper_json() {
        let content = r#"{
            "text": " Hello world.",
            "segments": [
                {"id": 0, "seek": 0, "start": 0.0, "end": 2.5, "text": " Hello world.", "temperature": 0.0}
            ],
            "language": "en"
        }"#;

        let parsed: WhisperJson = serde_json::from_str(content).unwrap();
        assert_eq!(parsed.segments.len(), 1);
        assert_eq!(parsed.segments[0].end, 2.5);
        assert_eq!(parsed.text, " Hello world.");
    }
}
