//! Ask command implementation.

use crate::answer::{Answer, AnswerEngine, AnswerEvent, LlmClient, LlmConfig};
use crate::cli::preflight::{self, Operation};
use crate::config::Settings;
use crate::embedding::HttpEmbedder;
use crate::error::Result;
use crate::store::SqliteStore;
use anyhow::Result as AnyResult;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// Run the ask command.
///
/// Non-streaming mode prints one JSON object: the final answer, or
/// `{"error": ...}` for reported conditions. Streaming mode prints
/// newline-delimited events: zero or more `token` events, then exactly one
/// terminal `final` or `error` event. Reported errors exit cleanly;
/// configuration errors stay fatal.
pub async fn run_ask(
    question: &str,
    course: &str,
    db: Option<String>,
    stream: bool,
    top_k: Option<usize>,
    model: Option<String>,
    mut settings: Settings,
) -> AnyResult<()> {
    if let Some(db) = db {
        settings.store.db_path = db;
    }
    if let Some(model) = model {
        settings.answer.model = model;
    }
    if let Some(top_k) = top_k {
        settings.answer.top_k = top_k;
    }

    // Missing API key or bad endpoint fails before any work.
    preflight::check(Operation::Ask, &settings)?;

    let result = answer(&settings, course, question, stream).await;

    match result {
        Ok(answer) => {
            if stream {
                emit_event(&AnswerEvent::Final(answer));
            } else {
                println!("{}", serde_json::to_string(&answer)?);
            }
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            let message = e.to_string();
            if stream {
                emit_event(&AnswerEvent::Error { message });
            } else {
                println!("{}", serde_json::json!({ "error": message }));
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Build the engine and produce the answer.
async fn answer(settings: &Settings, course: &str, question: &str, stream: bool) -> Result<Answer> {
    let store = Arc::new(SqliteStore::new(&settings.db_path())?);

    let embedder = Arc::new(HttpEmbedder::new(
        &settings.embedding.endpoint,
        &settings.embedding.model,
        Duration::from_secs(settings.embedding.timeout_seconds),
    )?);

    let llm = LlmClient::new(LlmConfig {
        endpoint: settings.answer.endpoint.clone(),
        model: settings.answer.model.clone(),
        temperature: settings.answer.temperature,
        timeout: Duration::from_secs(settings.answer.timeout_seconds),
        api_key: settings.answer.resolve_api_key()?,
        referer: settings.answer.referer.clone(),
        app_title: settings.answer.app_title.clone(),
    })?;

    let engine = AnswerEngine::new(store, embedder, llm, settings.answer.top_k);

    if stream {
        let mut on_token = |token: &str| {
            emit_event(&AnswerEvent::Token {
                content: token.to_string(),
            });
        };
        engine.ask_streaming(course, question, &mut on_token).await
    } else {
        engine.ask(course, question).await
    }
}

/// Print one newline-delimited event and flush so consumers see tokens as
/// they arrive.
fn emit_event(event: &AnswerEvent) {
    if let Ok(line) = serde_json::to_string(event) {
        println!("{}", line);
        let _ = std::io::stdout().flush();
    }
}
