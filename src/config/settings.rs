//! Configuration settings for Lektor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub ingest: IngestSettings,
    pub transcription: TranscriptionSettings,
    pub merge: MergeSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub answer: AnswerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.lektor".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Default locations for the ingestion pipeline's working directories
/// and artifacts. Each can be overridden per run from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Directory with input video files.
    pub video_dir: String,
    /// Output directory for extracted audio.
    pub audio_dir: String,
    /// Output directory for per-file transcript JSON documents.
    pub json_dir: String,
    /// Output directory for merged transcript JSON documents.
    pub merged_json_dir: String,
    /// Output path for the embedded chunk table.
    pub embeddings_path: String,
    /// Output path for the chunk-level index.
    pub index_path: String,
    /// Output path for the video-level index.
    pub video_index_path: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            video_dir: "Videos".to_string(),
            audio_dir: "audio".to_string(),
            json_dir: "jsons".to_string(),
            merged_json_dir: "new_jsons".to_string(),
            embeddings_path: "embeddings.json".to_string(),
            index_path: "chunk_index.json".to_string(),
            video_index_path: "video_index.json".to_string(),
        }
    }
}

/// Transcription settings for the external speech-to-text tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Name of the transcription binary on PATH.
    pub binary: String,
    /// Model size to load (tiny, base, small, medium, large).
    pub model: String,
    /// Device to run on (cpu, cuda). None lets the tool pick.
    pub device: Option<String>,
    /// Run a second pass translating to English.
    pub translate: bool,
    /// Force a source language instead of auto-detection.
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            binary: "whisper".to_string(),
            model: "small".to_string(),
            device: None,
            translate: false,
            language: None,
        }
    }
}

/// Segment merging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Number of consecutive segments merged into one chunk.
    pub merge_size: usize,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self { merge_size: 5 }
    }
}

/// Embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding HTTP endpoint.
    pub endpoint: String,
    /// Embedding model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/embed".to_string(),
            model: "bge-m3".to_string(),
            timeout_seconds: 60,
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the SQLite database file.
    pub db_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: "~/.lektor/courses.db".to_string(),
        }
    }
}

/// Retrieval and answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    /// Chat-completions HTTP endpoint.
    pub endpoint: String,
    /// LLM model for answer generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Number of nearest chunks used to ground the answer.
    /// Both 9 and 6 have been used as operating points; 9 is the default.
    pub top_k: usize,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// API key for the LLM endpoint. Falls back to OPENROUTER_API_KEY.
    pub api_key: Option<String>,
    /// Referer header sent to the LLM endpoint.
    pub referer: String,
    /// Application title header sent to the LLM endpoint.
    pub app_title: String,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "openai/gpt-oss-120b".to_string(),
            temperature: 0.2,
            top_k: 9,
            timeout_seconds: 120,
            api_key: None,
            referer: "http://localhost".to_string(),
            app_title: "Lektor RAG".to_string(),
        }
    }
}

impl AnswerSettings {
    /// Resolve the API key from settings or the environment.
    pub fn resolve_api_key(&self) -> crate::error::Result<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        match std::env::var("OPENROUTER_API_KEY") {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(crate::error::LektorError::Config(
                "No LLM API key configured. Set answer.api_key in config.toml \
                 or export OPENROUTER_API_KEY."
                    .to_string(),
            )),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LektorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lektor")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn db_path(&self) -> PathBuf {
        Self::expand_path(&self.store.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.merge.merge_size, 5);
        assert_eq!(settings.answer.top_k, 9);
        assert_eq!(settings.transcription.model, "small");
        assert!(settings.transcription.device.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [merge]
            merge_size = 3

            [answer]
            top_k = 6
            "#,
        )
        .unwrap();

        assert_eq!(settings.merge.merge_size, 3);
        assert_eq!(settings.answer.top_k, 6);
        assert_eq!(settings.embedding.model, "bge-m3");
    }
}
