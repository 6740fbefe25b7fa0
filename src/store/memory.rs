//! In-memory document store implementation.
//!
//! Useful for testing and dry runs.

use super::{
    courses_from_collections, ChunkRecord, CourseInfo, DocumentStore, StoredTranscript,
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<ChunkRecord>>>,
    transcripts: RwLock<Vec<StoredTranscript>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transcripts.
    pub fn transcript_count(&self) -> usize {
        self.transcripts.read().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_chunks(&self, collection: &str, records: &[ChunkRecord]) -> Result<usize> {
        let mut collections = self.collections.write().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .extend(records.iter().cloned());
        Ok(records.len())
    }

    async fn fetch_chunks(&self, collection: &str) -> Result<Vec<ChunkRecord>> {
        let collections = self.collections.read().unwrap();
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn clear_collection(&self, collection: &str) -> Result<usize> {
        let mut collections = self.collections.write().unwrap();
        Ok(collections
            .get_mut(collection)
            .map(|records| {
                let removed = records.len();
                records.clear();
                removed
            })
            .unwrap_or(0))
    }

    async fn insert_transcript(&self, transcript: &StoredTranscript) -> Result<()> {
        self.transcripts.write().unwrap().push(transcript.clone());
        Ok(())
    }

    async fn list_courses(&self) -> Result<Vec<CourseInfo>> {
        let collections = self.collections.read().unwrap();
        Ok(courses_from_collections(collections.keys().cloned()))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().unwrap();
        Ok(collections.get(collection).map(|r| r.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chunk_id: u64) -> ChunkRecord {
        ChunkRecord {
            title: "Intro".to_string(),
            number: "1".to_string(),
            start: 0.0,
            end: 10.0,
            text: "text".to_string(),
            chunk_id,
            embedding: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn test_append_only_semantics() {
        let store = MemoryStore::new();
        let collection = "course_embeddings_test";

        store.insert_chunks(collection, &[record(0)]).await.unwrap();
        store.insert_chunks(collection, &[record(0)]).await.unwrap();

        assert_eq!(store.count(collection).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fetch_preserves_insertion_order() {
        let store = MemoryStore::new();
        let collection = "course_embeddings_test";

        store
            .insert_chunks(collection, &[record(2), record(0), record(1)])
            .await
            .unwrap();

        let ids: Vec<u64> = store
            .fetch_chunks(collection)
            .await
            .unwrap()
            .iter()
            .map(|r| r.chunk_id)
            .collect();
        assert_eq!(ids, vec![2, 0, 1]);
    }
}
