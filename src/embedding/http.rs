//! HTTP embedding service client.
//!
//! Posts `{model, input: [text...]}` to the configured endpoint and expects
//! `{embeddings: [[f32...]]}` back. A response without the `embeddings`
//! field fails the whole batch; there is no partial credit.

use super::Embedder;
use crate::error::{LektorError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Embedder backed by an HTTP embedding service.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Option<Vec<Vec<f32>>>,
}

impl HttpEmbedder {
    /// Create an embedder for the given endpoint and model.
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LektorError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LektorError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting embeddings for {} texts", texts.len());

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LektorError::Embedding(format!(
                "Embedding service returned {}",
                response.status()
            )));
        }

        let payload: EmbedResponse = response.json().await?;

        let embeddings = payload.embeddings.ok_or_else(|| {
            LektorError::Embedding("Embedding service did not return embeddings".to_string())
        })?;

        if embeddings.len() != texts.len() {
            return Err(LektorError::Embedding(format!(
                "Embedding service returned {} vectors for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }

        debug!("Received {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let input = vec!["first".to_string(), "second".to_string()];
        let request = EmbedRequest {
            model: "bge-m3",
            input: &input,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "bge-m3");
        assert_eq!(json["input"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_embeddings_field_is_detected() {
        let payload: EmbedResponse = serde_json::from_str(r#"{"error": "model not loaded"}"#).unwrap();
        assert!(payload.embeddings.is_none());
    }
}
