//! Configuration module for Lektor.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    AnswerSettings, EmbeddingSettings, GeneralSettings, IngestSettings, MergeSettings, Settings,
    StoreSettings, TranscriptionSettings,
};
