//! CLI module for Lektor.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Lektor - Lecture Video RAG
///
/// Turns lecture videos into a searchable course knowledge base and answers
/// questions with video and timestamp citations.
#[derive(Parser, Debug)]
#[command(name = "lektor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Progress output format for the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressFormat {
    /// Newline-delimited JSON events.
    Json,
    /// Human-readable progress bar.
    Pretty,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion pipeline: convert, transcribe, merge, embed,
    /// index, and store a course's videos
    Ingest(IngestArgs),

    /// Ask a question against one course's stored chunks
    Ask {
        /// The question to ask
        question: String,

        /// Course to search
        #[arg(short, long)]
        course: String,

        /// Path to the course database
        #[arg(long)]
        db: Option<String>,

        /// Stream tokens as they arrive instead of one final object
        #[arg(long)]
        stream: bool,

        /// Number of nearest chunks used to ground the answer
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// LLM model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List courses available in the database
    Courses {
        /// Path to the course database
        #[arg(long)]
        db: Option<String>,
    },

    /// Check system requirements and configuration
    Doctor,
}

/// Arguments for the ingestion pipeline.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Course the ingested videos belong to
    #[arg(short, long)]
    pub course: String,

    /// Directory with input video files
    #[arg(long)]
    pub video_dir: Option<String>,

    /// Output directory for extracted audio
    #[arg(long)]
    pub audio_dir: Option<String>,

    /// Output directory for transcript JSON documents
    #[arg(long)]
    pub json_dir: Option<String>,

    /// Output directory for merged transcript JSON documents
    #[arg(long)]
    pub merged_json_dir: Option<String>,

    /// Speech-to-text model size (tiny, base, small, medium, large)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Device for the speech-to-text tool (cpu, cuda)
    #[arg(long)]
    pub device: Option<String>,

    /// Run a second pass translating to English
    #[arg(long)]
    pub translate: bool,

    /// Force the source language instead of auto-detection
    #[arg(long)]
    pub language: Option<String>,

    /// Number of consecutive segments merged per chunk
    #[arg(long)]
    pub merge_size: Option<usize>,

    /// Output path for the embedded chunk table
    #[arg(long)]
    pub embeddings_out: Option<String>,

    /// Output path for the chunk-level index
    #[arg(long)]
    pub index_out: Option<String>,

    /// Output path for the video-level index
    #[arg(long)]
    pub video_index_out: Option<String>,

    /// Path to the course database
    #[arg(long)]
    pub db: Option<String>,

    /// Override the chunk collection name derived from the course
    #[arg(long)]
    pub collection: Option<String>,

    /// Skip the persistence stage (artifacts only)
    #[arg(long)]
    pub no_db: bool,

    /// Override the video title inferred from filenames
    #[arg(long)]
    pub video_title: Option<String>,

    /// Override the episode number inferred from filenames
    #[arg(long)]
    pub video_number: Option<String>,

    /// Clear the course collection before inserting
    #[arg(long)]
    pub clean: bool,

    /// Overwrite existing audio files
    #[arg(long)]
    pub overwrite_audio: bool,

    /// Progress output format
    #[arg(long, value_enum, default_value = "json")]
    pub progress: ProgressFormat,
}
