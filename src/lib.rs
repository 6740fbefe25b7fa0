//! Lektor - Lecture Video RAG
//!
//! A CLI pipeline for turning lecture videos into a searchable course
//! knowledge base with cited, timestamped answers.
//!
//! # Overview
//!
//! Lektor allows you to:
//! - Convert lecture videos to audio and transcribe them with timestamps
//! - Merge transcript segments into retrieval-sized chunks and embed them
//! - Store chunks per course and build flat nearest-neighbor indexes
//! - Ask questions and get answers citing the video and timestamp window
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `media` - Video to audio conversion
//! - `transcription` - Speech-to-text transcription
//! - `chunking` - Segment merging
//! - `embedding` - Embedding generation
//! - `index` - Flat nearest-neighbor indexes
//! - `store` - Course document store
//! - `answer` - Retrieval and answer generation
//! - `pipeline` - Ingestion pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use lektor::config::Settings;
//! use lektor::pipeline::{IngestOptions, IngestPipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let options = IngestOptions::from_settings(&settings, "Web Dev 101");
//!     let pipeline = IngestPipeline::new(&settings)?;
//!
//!     let report = pipeline.run(&options).await?;
//!     println!("Stored {} chunks", report.chunks_stored);
//!
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod media;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod transcription;

pub use error::{LektorError, Result};
