//! Course document store.
//!
//! Provides a trait-based interface over the document database holding
//! embedded chunk records and merged transcripts, partitioned per course.
//!
//! Writes are append-only inserts: re-running ingestion for the same video
//! duplicates records unless the caller clears the collection first. That
//! is the documented contract, not an accident.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::chunking::MergedDocument;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix for per-course chunk collections.
pub const COURSE_PREFIX: &str = "course_embeddings_";

/// Collection holding merged transcript documents for all courses.
pub const TRANSCRIPTS_COLLECTION: &str = "course_jsons";

/// Slug used when a course name normalizes to nothing.
pub const DEFAULT_SLUG: &str = "rag_basic";

/// An embedded chunk record as stored per course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Video title.
    pub title: String,
    /// Episode number.
    #[serde(rename = "Number")]
    pub number: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Chunk text.
    pub text: String,
    /// Monotonic id assigned across one embedding batch.
    pub chunk_id: u64,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

/// A merged transcript document stored with its course/video metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTranscript {
    /// Course name as given by the caller.
    pub course: String,
    /// Video title.
    pub video_title: String,
    /// Episode number.
    pub video_number: String,
    /// The merged transcript document.
    pub document: MergedDocument,
    /// When this document was stored.
    pub stored_at: DateTime<Utc>,
}

/// Summary of one course derived from its collection name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseInfo {
    /// Course slug.
    pub id: String,
    /// Human-readable course name.
    pub name: String,
    /// Backing collection name.
    pub collection: String,
}

/// Normalize a free-text course name into a storage-safe slug.
///
/// Lowercase, non `[a-z0-9_-]` characters become underscores, runs of
/// underscores collapse, and leading/trailing underscores are trimmed.
/// Idempotent; an empty result falls back to [`DEFAULT_SLUG`].
pub fn course_slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let replaced = Regex::new(r"[^a-z0-9_-]")
        .expect("valid regex")
        .replace_all(&lowered, "_");
    let collapsed = Regex::new(r"_+")
        .expect("valid regex")
        .replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');

    if trimmed.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Collection name for a course's chunk records.
pub fn collection_for_course(name: &str) -> String {
    format!("{}{}", COURSE_PREFIX, course_slug(name))
}

/// Turn a slug back into a display name (`web_dev_101` -> `Web Dev 101`).
pub fn display_name(slug: &str) -> String {
    let words: Vec<String> = slug
        .split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        "General".to_string()
    } else {
        words.join(" ")
    }
}

/// Trait for document store implementations.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append chunk records to a collection. Pure insert-many: no upsert,
    /// no dedup. Returns the number of inserted records.
    async fn insert_chunks(&self, collection: &str, records: &[ChunkRecord]) -> Result<usize>;

    /// Load every chunk record in a collection, in insertion order.
    /// A missing collection reads as empty.
    async fn fetch_chunks(&self, collection: &str) -> Result<Vec<ChunkRecord>>;

    /// Remove all records from a collection. Returns the number removed.
    async fn clear_collection(&self, collection: &str) -> Result<usize>;

    /// Append a merged transcript document.
    async fn insert_transcript(&self, transcript: &StoredTranscript) -> Result<()>;

    /// List courses derived from existing collection names, sorted by
    /// display name.
    async fn list_courses(&self) -> Result<Vec<CourseInfo>>;

    /// Number of records in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Build course summaries from raw collection names.
pub(crate) fn courses_from_collections(names: impl IntoIterator<Item = String>) -> Vec<CourseInfo> {
    let mut courses: Vec<CourseInfo> = names
        .into_iter()
        .filter_map(|collection| {
            let slug = collection.strip_prefix(COURSE_PREFIX)?.to_string();
            Some(CourseInfo {
                name: display_name(&slug),
                id: slug,
                collection,
            })
        })
        .collect();
    courses.sort_by(|a, b| a.name.cmp(&b.name));
    courses
}
