//! SQLite-based document store implementation.
//!
//! Collections are dynamically-created tables: one per course for chunk
//! records, plus a shared table for merged transcripts. Embeddings are
//! stored as little-endian f32 BLOBs.

use super::{
    courses_from_collections, ChunkRecord, CourseInfo, DocumentStore, StoredTranscript,
    COURSE_PREFIX, TRANSCRIPTS_COLLECTION,
};
use crate::error::{LektorError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

/// SQLite-backed document store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a document store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init_schema(&conn)?;

        info!("Opened document store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory document store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{}" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course TEXT NOT NULL,
                video_title TEXT NOT NULL,
                video_number TEXT NOT NULL,
                document TEXT NOT NULL,
                stored_at TEXT NOT NULL
            );
            "#,
            TRANSCRIPTS_COLLECTION
        ))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LektorError::Store(format!("Failed to acquire lock: {}", e)))
    }

    /// Collection names come from slugs, so anything else is rejected
    /// before it reaches SQL.
    fn validate_collection(collection: &str) -> Result<()> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if valid {
            Ok(())
        } else {
            Err(LektorError::Store(format!(
                "Invalid collection name: {}",
                collection
            )))
        }
    }

    fn ensure_chunk_table(conn: &Connection, collection: &str) -> Result<()> {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{}" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chunk_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                number TEXT NOT NULL,
                start_seconds REAL NOT NULL,
                end_seconds REAL NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL
            );
            "#,
            collection
        ))?;
        Ok(())
    }

    fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Serialize an embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize an embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    #[instrument(skip(self, records))]
    async fn insert_chunks(&self, collection: &str, records: &[ChunkRecord]) -> Result<usize> {
        Self::validate_collection(collection)?;
        let conn = self.lock()?;
        Self::ensure_chunk_table(&conn, collection)?;

        let tx = conn.unchecked_transaction()?;

        for record in records {
            let embedding_bytes = Self::embedding_to_bytes(&record.embedding);
            tx.execute(
                &format!(
                    r#"
                    INSERT INTO "{}"
                    (chunk_id, title, number, start_seconds, end_seconds, text, embedding)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    collection
                ),
                params![
                    record.chunk_id as i64,
                    record.title,
                    record.number,
                    record.start,
                    record.end,
                    record.text,
                    embedding_bytes,
                ],
            )?;
        }

        tx.commit()?;
        info!("Inserted {} records into {}", records.len(), collection);
        Ok(records.len())
    }

    #[instrument(skip(self))]
    async fn fetch_chunks(&self, collection: &str) -> Result<Vec<ChunkRecord>> {
        Self::validate_collection(collection)?;
        let conn = self.lock()?;

        if !Self::table_exists(&conn, collection)? {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT chunk_id, title, number, start_seconds, end_seconds, text, embedding
            FROM "{}"
            ORDER BY id
            "#,
            collection
        ))?;

        let records = stmt.query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(6)?;
            let chunk_id: i64 = row.get(0)?;
            Ok(ChunkRecord {
                chunk_id: chunk_id as u64,
                title: row.get(1)?,
                number: row.get(2)?,
                start: row.get(3)?,
                end: row.get(4)?,
                text: row.get(5)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
            })
        })?;

        let result: Vec<ChunkRecord> = records.filter_map(|r| r.ok()).collect();
        debug!("Fetched {} records from {}", result.len(), collection);
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn clear_collection(&self, collection: &str) -> Result<usize> {
        Self::validate_collection(collection)?;
        let conn = self.lock()?;

        if !Self::table_exists(&conn, collection)? {
            return Ok(0);
        }

        let removed = conn.execute(&format!(r#"DELETE FROM "{}""#, collection), [])?;
        info!("Cleared {} records from {}", removed, collection);
        Ok(removed)
    }

    #[instrument(skip(self, transcript))]
    async fn insert_transcript(&self, transcript: &StoredTranscript) -> Result<()> {
        let conn = self.lock()?;

        let document_json = serde_json::to_string(&transcript.document)?;

        conn.execute(
            &format!(
                r#"
                INSERT INTO "{}" (course, video_title, video_number, document, stored_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                TRANSCRIPTS_COLLECTION
            ),
            params![
                transcript.course,
                transcript.video_title,
                transcript.video_number,
                document_json,
                transcript.stored_at.to_rfc3339(),
            ],
        )?;

        debug!("Stored transcript for {}", transcript.video_title);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_courses(&self) -> Result<Vec<CourseInfo>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE ?1 ORDER BY name",
        )?;

        let names = stmt.query_map(params![format!("{}%", COURSE_PREFIX)], |row| {
            row.get::<_, String>(0)
        })?;

        Ok(courses_from_collections(names.filter_map(|n| n.ok())))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Self::validate_collection(collection)?;
        let conn = self.lock()?;

        if !Self::table_exists(&conn, collection)? {
            return Ok(0);
        }

        let count: i64 = conn.query_row(
            &format!(r#"SELECT COUNT(*) FROM "{}""#, collection),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::MergedDocument;
    use chrono::Utc;

    fn record(chunk_id: u64, text: &str) -> ChunkRecord {
        ChunkRecord {
            title: "Intro".to_string(),
            number: "1".to_string(),
            start: 0.0,
            end: 50.0,
            text: text.to_string(),
            chunk_id,
            embedding: vec![0.1, 0.2, 0.3],
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_round() {
        let store = SqliteStore::in_memory().unwrap();
        let collection = "course_embeddings_web_dev_101";

        store
            .insert_chunks(collection, &[record(0, "html basics"), record(1, "css basics")])
            .await
            .unwrap();

        let records = store.fetch_chunks(collection).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chunk_id, 0);
        assert_eq!(records[1].text, "css basics");
        assert_eq!(records[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_reingest_duplicates_by_design() {
        let store = SqliteStore::in_memory().unwrap();
        let collection = "course_embeddings_web_dev_101";

        store.insert_chunks(collection, &[record(0, "html")]).await.unwrap();
        store.insert_chunks(collection, &[record(0, "html")]).await.unwrap();

        // Append-only: the same record inserted twice is stored twice.
        assert_eq!(store.count(collection).await.unwrap(), 2);

        store.clear_collection(collection).await.unwrap();
        assert_eq!(store.count(collection).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_collection_reads_empty() {
        let store = SqliteStore::in_memory().unwrap();
        let records = store.fetch_chunks("course_embeddings_nothing").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_list_courses_from_tables() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_chunks("course_embeddings_web_dev_101", &[record(0, "html")])
            .await
            .unwrap();
        store
            .insert_chunks("course_embeddings_algorithms", &[record(0, "sorting")])
            .await
            .unwrap();

        let courses = store.list_courses().await.unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].name, "Algorithms");
        assert_eq!(courses[1].name, "Web Dev 101");
    }

    #[tokio::test]
    async fn test_rejects_unsafe_collection_name() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.fetch_chunks("bad name; DROP TABLE x").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_insert_transcript() {
        let store = SqliteStore::in_memory().unwrap();
        let transcript = StoredTranscript {
            course: "Web Dev 101".to_string(),
            video_title: "Intro".to_string(),
            video_number: "1".to_string(),
            document: MergedDocument {
                chunks: Vec::new(),
                text: "full text".to_string(),
            },
            stored_at: Utc::now(),
        };

        store.insert_transcript(&transcript).await.unwrap();
        assert_eq!(store.count(TRANSCRIPTS_COLLECTION).await.unwrap(), 1);
    }
}
