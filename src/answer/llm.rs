//! Chat-completions client for answer generation.
//!
//! Speaks the chat-completions wire format: a JSON request with
//! `{model, messages, temperature, stream}`, answered either as a single
//! JSON body or as a server-sent-event token stream.

use super::sse::{decode_line, LineBuffer, StreamEvent};
use crate::error::{LektorError, Result};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Configuration for the LLM endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat-completions endpoint URL.
    pub endpoint: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout.
    pub timeout: Duration,
    /// Bearer token.
    pub api_key: String,
    /// Referer header value.
    pub referer: String,
    /// Application title header value.
    pub app_title: String,
}

/// Client for the LLM completion service.
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

impl LlmClient {
    /// Create a client with the configured timeout.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LektorError::Answer(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn request(&self, system: &str, user: &str, stream: bool) -> reqwest::RequestBuilder {
        self.client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.app_title)
            .json(&ChatRequest {
                model: &self.config.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: system,
                    },
                    ChatMessage {
                        role: "user",
                        content: user,
                    },
                ],
                temperature: self.config.temperature,
                stream,
            })
    }

    /// Request a full completion and return the first choice's content.
    #[instrument(skip_all)]
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let response = self.request(system, user, false).send().await?;

        if !response.status().is_success() {
            return Err(LektorError::Answer(format!(
                "LLM service returned {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LektorError::Answer("LLM did not return any choices".to_string()))?;

        Ok(content.trim().to_string())
    }

    /// Request a streamed completion, invoking `on_token` per token as it
    /// arrives, and return the concatenated answer.
    ///
    /// A stream that terminates without yielding a single token is the
    /// reported "no answer" condition.
    #[instrument(skip_all)]
    pub async fn complete_streaming(
        &self,
        system: &str,
        user: &str,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String> {
        let response = self.request(system, user, true).send().await?;

        if !response.status().is_success() {
            return Err(LektorError::Answer(format!(
                "LLM service returned {}",
                response.status()
            )));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = LineBuffer::new();
        let mut answer = String::new();
        let mut done = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in buffer.push(&chunk) {
                match decode_line(&line) {
                    Some(StreamEvent::Token(token)) => {
                        on_token(&token);
                        answer.push_str(&token);
                    }
                    Some(StreamEvent::Done) => {
                        done = true;
                        break;
                    }
                    None => {}
                }
            }
            if done {
                break;
            }
        }

        debug!("Streamed {} characters", answer.len());

        if answer.is_empty() {
            return Err(LektorError::NoAnswer);
        }

        Ok(answer)
    }
}
