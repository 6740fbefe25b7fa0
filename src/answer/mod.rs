//! Retrieval and answer generation with citations.
//!
//! Answers a free-text question against one course's stored chunks: embed
//! the question, find the nearest chunks, ground an LLM completion on them,
//! and cite the best match with its video, timestamp window, and a
//! confidence score.

mod llm;
mod prompt;
pub mod sse;

pub use llm::{LlmClient, LlmConfig};
pub use prompt::{build_grounding_prompt, SYSTEM_PROMPT};

use crate::embedding::Embedder;
use crate::error::{LektorError, Result};
use crate::index::FlatIndex;
use crate::store::{collection_for_course, ChunkRecord, DocumentStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A cited timestamp window.
#[derive(Debug, Clone, Serialize)]
pub struct Timestamp {
    pub start: f64,
    pub end: f64,
}

/// A complete answer with its citation.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The generated answer text.
    pub answer: String,
    /// Title of the best-matching video.
    pub video: String,
    /// Timestamp window of the best-matching chunk.
    pub timestamp: Timestamp,
    /// Raw text of the best-matching chunk, as a supporting summary.
    pub summary: String,
    /// Derived confidence in (0, 1].
    pub confidence: f64,
}

/// One event on the streaming answer path.
///
/// A stream is zero or more `token` events followed by exactly one terminal
/// `final` or `error` event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnswerEvent {
    Token { content: String },
    Final(Answer),
    Error { message: String },
}

/// Confidence score derived from the nearest-neighbor distance.
///
/// Equals 1 at distance 0 and decreases monotonically as the distance
/// grows, staying within (0, 1]. Not a calibrated probability.
pub fn confidence(distance: f32) -> f64 {
    1.0 / (1.0 + distance as f64)
}

/// Engine answering questions against a course's stored chunks.
pub struct AnswerEngine {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    llm: LlmClient,
    top_k: usize,
}

/// The retrieved grounding set for one question.
struct Retrieval {
    rows: Vec<ChunkRecord>,
    top_distance: f32,
}

impl AnswerEngine {
    /// Create an engine over the given store, embedder, and LLM client.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        llm: LlmClient,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            llm,
            top_k,
        }
    }

    /// Load the course's chunks and retrieve the top-k nearest to the
    /// question.
    async fn retrieve(&self, course: &str, question: &str) -> Result<Retrieval> {
        let collection = collection_for_course(course);
        let records = self.store.fetch_chunks(&collection).await?;

        if records.is_empty() {
            return Err(LektorError::NoEmbeddings);
        }
        info!("Loaded {} chunks from {}", records.len(), collection);

        let query = self.embedder.embed(question).await?;

        // Brute-force search over the loaded vectors. Any record whose
        // embedding dimension disagrees with the query makes the corpus
        // unsearchable rather than silently dropping rows.
        let mut index = FlatIndex::new(query.len());
        let mut aligned = true;
        for record in &records {
            if index.add(record.embedding.clone()).is_err() {
                aligned = false;
                break;
            }
        }

        let hits = if aligned {
            index.search(&query, self.top_k)
        } else {
            Vec::new()
        };

        if hits.is_empty() {
            return Err(LektorError::SearchUnavailable);
        }
        debug!("Top match at distance {:.4}", hits[0].distance);

        let top_distance = hits[0].distance;
        let rows = hits
            .into_iter()
            .map(|hit| records[hit.index].clone())
            .collect();

        Ok(Retrieval { rows, top_distance })
    }

    fn finalize(retrieval: &Retrieval, answer: String) -> Answer {
        let top = &retrieval.rows[0];
        Answer {
            answer,
            video: top.title.clone(),
            timestamp: Timestamp {
                start: top.start,
                end: top.end,
            },
            summary: top.text.clone(),
            confidence: confidence(retrieval.top_distance),
        }
    }

    /// Answer a question in one shot.
    #[instrument(skip(self), fields(course = %course))]
    pub async fn ask(&self, course: &str, question: &str) -> Result<Answer> {
        let retrieval = self.retrieve(course, question).await?;

        let row_refs: Vec<&ChunkRecord> = retrieval.rows.iter().collect();
        let user_prompt = build_grounding_prompt(question, &row_refs, course);

        let answer = self.llm.complete(SYSTEM_PROMPT, &user_prompt).await?;

        Ok(Self::finalize(&retrieval, answer))
    }

    /// Answer a question, streaming tokens through `on_token` as they
    /// arrive, and return the final answer with its citation.
    #[instrument(skip(self, on_token), fields(course = %course))]
    pub async fn ask_streaming(
        &self,
        course: &str,
        question: &str,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<Answer> {
        let retrieval = self.retrieve(course, question).await?;

        let row_refs: Vec<&ChunkRecord> = retrieval.rows.iter().collect();
        let user_prompt = build_grounding_prompt(question, &row_refs, course);

        let answer = self
            .llm
            .complete_streaming(SYSTEM_PROMPT, &user_prompt, on_token)
            .await?;

        Ok(Self::finalize(&retrieval, answer))
    }
}
