//! Ingestion pipeline for Lektor.
//!
//! Coordinates the linear sequence that turns raw lecture videos into a
//! queryable course: convert to audio, transcribe, merge segments, embed,
//! build indexes, and persist per-course records. Each stage owns its input
//! and hands typed data to the next; progress is reported after every unit
//! of work.

use crate::chunking::{merge_segments, MergedDocument};
use crate::config::Settings;
use crate::embedding::{Embedder, HttpEmbedder};
use crate::error::{LektorError, Result};
use crate::index::{FlatIndex, VideoIndex};
use crate::media;
use crate::progress::{NullProgress, ProgressReporter};
use crate::store::{
    collection_for_course, ChunkRecord, DocumentStore, SqliteStore, StoredTranscript,
};
use crate::transcription::{
    is_audio_file, transcribe_file, TranscribeOptions, Transcriber, WhisperCliTranscriber,
};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Pipeline step names, in execution order.
const STEPS: [&str; 6] = ["convert", "transcribe", "merge", "embed", "index", "store"];

/// Per-run ingestion options.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Directory with input video files.
    pub video_dir: PathBuf,
    /// Output directory for extracted audio.
    pub audio_dir: PathBuf,
    /// Output directory for transcript JSON documents.
    pub json_dir: PathBuf,
    /// Output directory for merged transcript JSON documents.
    pub merged_json_dir: PathBuf,
    /// Segments merged per chunk.
    pub merge_size: usize,
    /// Output path for the embedded chunk table.
    pub embeddings_path: PathBuf,
    /// Output path for the chunk-level index.
    pub index_path: PathBuf,
    /// Output path for the video-level index.
    pub video_index_path: PathBuf,
    /// Course this ingestion run belongs to.
    pub course: String,
    /// Override the chunk collection name derived from the course.
    pub collection_override: Option<String>,
    /// Override the title inferred from filenames.
    pub title_override: Option<String>,
    /// Override the episode number inferred from filenames.
    pub number_override: Option<String>,
    /// Run a second translation pass.
    pub translate: bool,
    /// Force a source language instead of auto-detection.
    pub language: Option<String>,
    /// Overwrite existing audio files.
    pub overwrite_audio: bool,
    /// Clear the course collection before inserting.
    pub clean: bool,
}

impl IngestOptions {
    /// Build options from settings defaults for one course.
    pub fn from_settings(settings: &Settings, course: &str) -> Self {
        let ingest = &settings.ingest;
        Self {
            video_dir: Settings::expand_path(&ingest.video_dir),
            audio_dir: Settings::expand_path(&ingest.audio_dir),
            json_dir: Settings::expand_path(&ingest.json_dir),
            merged_json_dir: Settings::expand_path(&ingest.merged_json_dir),
            merge_size: settings.merge.merge_size,
            embeddings_path: Settings::expand_path(&ingest.embeddings_path),
            index_path: Settings::expand_path(&ingest.index_path),
            video_index_path: Settings::expand_path(&ingest.video_index_path),
            course: course.to_string(),
            collection_override: None,
            title_override: None,
            number_override: None,
            translate: settings.transcription.translate,
            language: settings.transcription.language.clone(),
            overwrite_audio: false,
            clean: false,
        }
    }

    fn transcribe_options(&self) -> TranscribeOptions {
        TranscribeOptions {
            translate: self.translate,
            language: self.language.clone(),
            title_override: self.title_override.clone(),
            number_override: self.number_override.clone(),
        }
    }
}

/// Result of one ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    /// Videos converted to audio.
    pub videos_converted: usize,
    /// Audio files transcribed.
    pub files_transcribed: usize,
    /// Chunks embedded across all files.
    pub chunks_embedded: usize,
    /// Chunk records written to the document store.
    pub chunks_stored: usize,
}

/// The ingestion pipeline.
pub struct IngestPipeline {
    transcriber: Arc<dyn Transcriber>,
    embedder: Arc<dyn Embedder>,
    store: Option<Arc<dyn DocumentStore>>,
    reporter: Arc<dyn ProgressReporter>,
}

impl IngestPipeline {
    /// Create a pipeline with production components from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let transcriber = Arc::new(WhisperCliTranscriber::with_config(
            &settings.transcription.binary,
            &settings.transcription.model,
            settings.transcription.device.as_deref(),
        ));

        let embedder = Arc::new(HttpEmbedder::new(
            &settings.embedding.endpoint,
            &settings.embedding.model,
            Duration::from_secs(settings.embedding.timeout_seconds),
        )?);

        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::new(&settings.db_path())?);

        Ok(Self {
            transcriber,
            embedder,
            store: Some(store),
            reporter: Arc::new(NullProgress),
        })
    }

    /// Create a pipeline with custom components. A `None` store runs the
    /// pipeline artifacts-only, without the persistence stage.
    pub fn with_components(
        transcriber: Arc<dyn Transcriber>,
        embedder: Arc<dyn Embedder>,
        store: Option<Arc<dyn DocumentStore>>,
    ) -> Self {
        Self {
            transcriber,
            embedder,
            store,
            reporter: Arc::new(NullProgress),
        }
    }

    /// Set the progress reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    fn report(&self, step_index: usize, fraction: f64) {
        let overall = (step_index as f64 + fraction.clamp(0.0, 1.0)) / STEPS.len() as f64;
        self.reporter.report(STEPS[step_index], overall);
    }

    /// Run the full pipeline.
    #[instrument(skip(self, options), fields(course = %options.course))]
    pub async fn run(&self, options: &IngestOptions) -> Result<IngestReport> {
        let (videos_converted, audio_files) = self.convert_step(options).await?;
        let documents = self.transcribe_step(options, &audio_files).await?;
        let merged = self.merge_step(options, &documents)?;
        let records = self.embed_step(options, &merged).await?;
        self.index_step(options, &records)?;
        let chunks_stored = self.store_step(options, &records, &merged).await?;

        Ok(IngestReport {
            videos_converted,
            files_transcribed: documents.len(),
            chunks_embedded: records.len(),
            chunks_stored,
        })
    }

    /// Convert videos to audio, then list the audio directory.
    ///
    /// The whole audio directory feeds the next stage, so previously
    /// converted files are transcribed too. Listing order is whatever the
    /// platform returns; it is not contractually sorted.
    async fn convert_step(&self, options: &IngestOptions) -> Result<(usize, Vec<PathBuf>)> {
        self.report(0, 0.0);

        let converted = media::convert_videos_to_audio(
            &options.video_dir,
            &options.audio_dir,
            options.overwrite_audio,
            |done, total| self.report(0, done as f64 / total.max(1) as f64),
        )
        .await?;

        let audio_files: Vec<PathBuf> = std::fs::read_dir(&options.audio_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_audio_file(path))
            .collect();

        self.report(0, 1.0);
        Ok((converted.len(), audio_files))
    }

    /// Transcribe each audio file and write its transcript document.
    async fn transcribe_step(
        &self,
        options: &IngestOptions,
        audio_files: &[PathBuf],
    ) -> Result<Vec<(String, crate::transcription::TranscriptDocument)>> {
        std::fs::create_dir_all(&options.json_dir)?;
        let transcribe_options = options.transcribe_options();

        let mut documents = Vec::with_capacity(audio_files.len());
        let total = audio_files.len();

        for (done, audio_path) in audio_files.iter().enumerate() {
            let stem = audio_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("audio")
                .to_string();

            info!("Transcribing {}", stem);
            let document =
                transcribe_file(self.transcriber.as_ref(), audio_path, &transcribe_options)
                    .await?;

            let output_path = options.json_dir.join(format!("{}.json", stem));
            std::fs::write(&output_path, serde_json::to_string_pretty(&document)?)?;

            documents.push((stem, document));
            self.report(1, (done + 1) as f64 / total.max(1) as f64);
        }

        self.report(1, 1.0);
        Ok(documents)
    }

    /// Merge each document's segments and write the merged variant.
    fn merge_step(
        &self,
        options: &IngestOptions,
        documents: &[(String, crate::transcription::TranscriptDocument)],
    ) -> Result<Vec<(String, MergedDocument)>> {
        std::fs::create_dir_all(&options.merged_json_dir)?;

        let mut merged = Vec::with_capacity(documents.len());
        let total = documents.len();

        for (done, (stem, document)) in documents.iter().enumerate() {
            let chunks = merge_segments(&document.chunks, options.merge_size.max(1));
            let text = if document.translated_text.is_empty() {
                document.original_text.clone()
            } else {
                document.translated_text.clone()
            };
            let merged_document = MergedDocument { chunks, text };

            let output_path = options.merged_json_dir.join(format!("{}.json", stem));
            std::fs::write(&output_path, serde_json::to_string_pretty(&merged_document)?)?;

            merged.push((stem.clone(), merged_document));
            self.report(2, (done + 1) as f64 / total.max(1) as f64);
        }

        self.report(2, 1.0);
        Ok(merged)
    }

    /// Embed each file's chunks in one batch and assign global chunk ids.
    async fn embed_step(
        &self,
        options: &IngestOptions,
        merged: &[(String, MergedDocument)],
    ) -> Result<Vec<ChunkRecord>> {
        let mut records = Vec::new();
        let mut chunk_id: u64 = 0;
        let total = merged.len();

        for (done, (stem, document)) in merged.iter().enumerate() {
            info!("Creating embeddings for {}", stem);

            let texts: Vec<String> = document.chunks.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            for (chunk, embedding) in document.chunks.iter().zip(embeddings) {
                records.push(ChunkRecord {
                    title: chunk.title.clone(),
                    number: chunk.number.clone(),
                    start: chunk.start,
                    end: chunk.end,
                    text: chunk.text.clone(),
                    chunk_id,
                    embedding,
                });
                chunk_id += 1;
            }

            self.report(3, (done + 1) as f64 / total.max(1) as f64);
        }

        if records.is_empty() {
            return Err(LektorError::InvalidInput(
                "No chunks were produced from the input videos".to_string(),
            ));
        }

        if let Some(parent) = options.embeddings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&options.embeddings_path, serde_json::to_string(&records)?)?;

        self.report(3, 1.0);
        Ok(records)
    }

    /// Build and save the chunk-level and video-level indexes.
    fn index_step(&self, options: &IngestOptions, records: &[ChunkRecord]) -> Result<()> {
        let index = FlatIndex::from_vectors(records.iter().map(|r| r.embedding.clone()).collect())?;
        index.save(&options.index_path)?;
        self.report(4, 0.5);

        let rows: Vec<(String, Vec<f32>)> = records
            .iter()
            .map(|r| (r.title.clone(), r.embedding.clone()))
            .collect();
        let video_index = VideoIndex::build(&rows)?;
        video_index.save(&options.video_index_path)?;

        self.report(4, 1.0);
        Ok(())
    }

    /// Persist chunk records and merged transcripts per course.
    async fn store_step(
        &self,
        options: &IngestOptions,
        records: &[ChunkRecord],
        merged: &[(String, MergedDocument)],
    ) -> Result<usize> {
        let Some(store) = &self.store else {
            self.report(5, 1.0);
            return Ok(0);
        };

        let collection = options
            .collection_override
            .clone()
            .unwrap_or_else(|| collection_for_course(&options.course));

        if options.clean {
            let removed = store.clear_collection(&collection).await?;
            info!("Cleared {} existing records from {}", removed, collection);
        }

        let stored = store.insert_chunks(&collection, records).await?;
        self.report(5, 0.5);

        for (_, document) in merged {
            let (video_title, video_number) = document
                .chunks
                .first()
                .map(|c| (c.title.clone(), c.number.clone()))
                .unwrap_or_default();

            store
                .insert_transcript(&StoredTranscript {
                    course: options.course.clone(),
                    video_title,
                    video_number,
                    document: document.clone(),
                    stored_at: Utc::now(),
                })
                .await?;
        }

        self.report(5, 1.0);
        info!("Stored {} chunk records in {}", stored, collection);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transcription::{Segment, TranscriptDocument};
    use async_trait::async_trait;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, _)| vec![i as f32, 1.0])
                .collect())
        }
    }

    struct UnusedTranscriber;

    #[async_trait]
    impl Transcriber for UnusedTranscriber {
        async fn transcribe(
            &self,
            _audio_path: &std::path::Path,
            _task: crate::transcription::Task,
            _language: Option<&str>,
        ) -> Result<crate::transcription::TranscriptionPass> {
            unreachable!("transcriber is not exercised in these tests")
        }
    }

    fn document(n: usize) -> TranscriptDocument {
        TranscriptDocument {
            original_text: "full text".to_string(),
            translated_text: String::new(),
            chunks: (0..n)
                .map(|i| Segment {
                    title: "Intro".to_string(),
                    number: "1".to_string(),
                    start: i as f64 * 10.0,
                    end: (i + 1) as f64 * 10.0,
                    text: format!("seg{}", i),
                    original_text: format!("seg{}", i),
                    translated_text: String::new(),
                })
                .collect(),
        }
    }

    fn options(dir: &std::path::Path) -> IngestOptions {
        let mut options = IngestOptions::from_settings(&Settings::default(), "Web Dev 101");
        options.video_dir = dir.join("videos");
        options.audio_dir = dir.join("audio");
        options.json_dir = dir.join("jsons");
        options.merged_json_dir = dir.join("new_jsons");
        options.embeddings_path = dir.join("embeddings.json");
        options.index_path = dir.join("chunk_index.json");
        options.video_index_path = dir.join("video_index.json");
        options
    }

    fn pipeline(store: Option<Arc<dyn DocumentStore>>) -> IngestPipeline {
        IngestPipeline::with_components(Arc::new(UnusedTranscriber), Arc::new(StubEmbedder), store)
    }

    #[tokio::test]
    async fn test_embed_step_assigns_global_chunk_ids() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let pipeline = pipeline(None);

        let merged = vec![
            (
                "1_Intro".to_string(),
                MergedDocument {
                    chunks: merge_segments(&document(12).chunks, 5),
                    text: "full text".to_string(),
                },
            ),
            (
                "2_CSS".to_string(),
                MergedDocument {
                    chunks: merge_segments(&document(5).chunks, 5),
                    text: "full text".to_string(),
                },
            ),
        ];

        let records = pipeline.embed_step(&options, &merged).await.unwrap();

        // 12 segments at merge size 5 give [5, 5, 2]; the second file adds one.
        assert_eq!(records.len(), 4);
        let ids: Vec<u64> = records.iter().map(|r| r.chunk_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(options.embeddings_path.exists());
    }

    #[tokio::test]
    async fn test_merge_then_index_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path());
        let pipeline = pipeline(None);

        let documents = vec![("1_Intro".to_string(), document(12))];
        let merged = pipeline.merge_step(&options, &documents).unwrap();
        assert_eq!(merged[0].1.chunks.len(), 3);

        let records = pipeline.embed_step(&options, &merged).await.unwrap();
        pipeline.index_step(&options, &records).unwrap();

        let index = FlatIndex::load(&options.index_path).unwrap();
        assert_eq!(index.len(), 3);

        let video_index = VideoIndex::load(&options.video_index_path).unwrap();
        assert_eq!(video_index.titles(), &["Intro".to_string()]);
    }

    #[tokio::test]
    async fn test_store_step_appends_and_clean_resets() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(dir.path());
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(Some(store.clone()));

        let documents = vec![("1_Intro".to_string(), document(5))];
        let merged = pipeline.merge_step(&options, &documents).unwrap();
        let records = pipeline.embed_step(&options, &merged).await.unwrap();

        pipeline.store_step(&options, &records, &merged).await.unwrap();
        pipeline.store_step(&options, &records, &merged).await.unwrap();

        // Append-only: running the store stage twice duplicates records.
        let collection = collection_for_course("Web Dev 101");
        assert_eq!(store.count(&collection).await.unwrap(), 2);

        options.clean = true;
        pipeline.store_step(&options, &records, &merged).await.unwrap();
        assert_eq!(store.count(&collection).await.unwrap(), 1);
        assert_eq!(store.transcript_count(), 3);
    }
}
