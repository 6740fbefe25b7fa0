//! Error types for Lektor.

use thiserror::Error;

/// Library-level error type for Lektor operations.
#[derive(Error, Debug)]
pub enum LektorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Media conversion failed: {0}")]
    MediaConvert(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Answer generation failed: {0}")]
    Answer(String),

    #[error("No embeddings found for selected course.")]
    NoEmbeddings,

    #[error("Unable to search in the selected course embeddings.")]
    SearchUnavailable,

    #[error("The model returned no answer.")]
    NoAnswer,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LektorError {
    /// Whether the answer path should report this error and exit cleanly
    /// instead of failing the process. Configuration problems stay fatal;
    /// external-service failures and data-absence conditions are reported.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            LektorError::Config(_) | LektorError::Io(_) | LektorError::TomlParse(_)
        )
    }
}

/// Result type alias for Lektor operations.
pub type Result<T> = std::result::Result<T, LektorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_split() {
        assert!(!LektorError::Config("missing key".into()).is_recoverable());
        assert!(LektorError::NoEmbeddings.is_recoverable());
        assert!(LektorError::SearchUnavailable.is_recoverable());
        assert!(LektorError::NoAnswer.is_recoverable());
        assert!(LektorError::Embedding("service down".into()).is_recoverable());
    }
}
