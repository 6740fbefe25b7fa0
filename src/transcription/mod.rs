//! Transcription module for Lektor.
//!
//! Runs an external speech-to-text tool over audio files and assembles
//! per-file transcript documents with timestamped segments. An optional
//! second pass translates to English; the two passes decode independently
//! and are aligned per segment index with an original-text fallback.

mod models;
mod whisper;

pub use models::{RawSegment, Segment, TranscriptDocument, TranscriptionPass};
pub use whisper::WhisperCliTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;

/// Audio extensions the transcriber picks up.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a"];

/// Transcription task for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Transcribe in the spoken language.
    Transcribe,
    /// Translate to English.
    Translate,
}

/// Trait for transcription backends.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Run one pass over an audio file and return timestamped segments.
    async fn transcribe(
        &self,
        audio_path: &Path,
        task: Task,
        language: Option<&str>,
    ) -> Result<TranscriptionPass>;
}

/// Per-run transcription options.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// Run a second translation pass.
    pub translate: bool,
    /// Force the source language instead of auto-detection.
    pub language: Option<String>,
    /// Override the title inferred from the filename.
    pub title_override: Option<String>,
    /// Override the episode number inferred from the filename.
    pub number_override: Option<String>,
}

/// Infer (number, title) metadata from an audio filename.
///
/// Accepts `Video_{number}_[{title}]`, then `{number}_{title}`, then falls
/// back to an empty number with the whole stem as title. Never fails.
pub fn extract_metadata_from_filename(filename: &str) -> (String, String) {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let re = Regex::new(r"^Video_(?P<number>[^_]+)_\[(?P<title>.+)\]$").expect("valid regex");
    if let Some(caps) = re.captures(stem) {
        return (caps["number"].to_string(), caps["title"].to_string());
    }

    if let Some((number, title)) = stem.split_once('_') {
        return (number.to_string(), title.to_string());
    }

    (String::new(), stem.to_string())
}

/// Transcribe one audio file into a transcript document.
///
/// Runs the original-language pass, then an optional translation pass, and
/// assembles them with the translated-or-original fallback per segment.
pub async fn transcribe_file(
    transcriber: &dyn Transcriber,
    audio_path: &Path,
    options: &TranscribeOptions,
) -> Result<TranscriptDocument> {
    let filename = audio_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let (inferred_number, inferred_title) = extract_metadata_from_filename(filename);

    let number = options
        .number_override
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or(inferred_number);
    let title = options
        .title_override
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or(inferred_title);

    let original = transcriber
        .transcribe(audio_path, Task::Transcribe, options.language.as_deref())
        .await?;

    let translated = if options.translate {
        Some(transcriber.transcribe(audio_path, Task::Translate, None).await?)
    } else {
        None
    };

    Ok(TranscriptDocument::from_passes(&title, &number, original, translated))
}

/// Check whether a path looks like an audio file we transcribe.
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_bracketed_form() {
        let (number, title) = extract_metadata_from_filename("Video_3_[Intro].mp3");
        assert_eq!(number, "3");
        assert_eq!(title, "Intro");
    }

    #[test]
    fn test_metadata_underscore_form() {
        let (number, title) = extract_metadata_from_filename("12_CSSGrid.mp3");
        assert_eq!(number, "12");
        assert_eq!(title, "CSSGrid");
    }

    #[test]
    fn test_metadata_fallback_whole_stem() {
        let (number, title) = extract_metadata_from_filename("lecture.mp3");
        assert_eq!(number, "");
        assert_eq!(title, "lecture");
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("a/1_Intro.mp3")));
        assert!(is_audio_file(Path::new("1_Intro.WAV")));
        assert!(!is_audio_file(Path::new("1_Intro.json")));
    }

    struct FakeTranscriber;

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(
            &self,
            _audio_path: &Path,
            task: Task,
            _language: Option<&str>,
        ) -> Result<TranscriptionPass> {
            let text = match task {
                Task::Transcribe => "hola mundo",
                Task::Translate => "hello world",
            };
            Ok(TranscriptionPass {
                text: text.to_string(),
                segments: vec![RawSegment {
                    start: 0.0,
                    end: 5.0,
                    text: text.to_string(),
                }],
            })
        }
    }

    #[tokio::test]
    async fn test_transcribe_file_with_translation() {
        let options = TranscribeOptions {
            translate: true,
            ..Default::default()
        };

        let doc = transcribe_file(&FakeTranscriber, Path::new("Video_2_[Basics].mp3"), &options)
            .await
            .unwrap();

        assert_eq!(doc.chunks.len(), 1);
        assert_eq!(doc.chunks[0].number, "2");
        assert_eq!(doc.chunks[0].title, "Basics");
        assert_eq!(doc.chunks[0].text, "hello world");
        assert_eq!(doc.chunks[0].original_text, "hola mundo");
    }

    #[tokio::test]
    async fn test_transcribe_file_overrides_metadata() {
        let options = TranscribeOptions {
            title_override: Some("Closures".to_string()),
            number_override: Some("9".to_string()),
            ..Default::default()
        };

        let doc = transcribe_file(&FakeTranscriber, Path::new("misc.mp3"), &options)
            .await
            .unwrap();

        assert_eq!(doc.chunks[0].title, "Closures");
        assert_eq!(doc.chunks[0].number, "9");
    }
}
