//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{IngestArgs, Output, ProgressFormat};
use crate::config::Settings;
use crate::embedding::{Embedder, HttpEmbedder};
use crate::error::Result;
use crate::pipeline::{IngestOptions, IngestPipeline, IngestReport};
use crate::progress::{ErrorEvent, JsonProgress, PrettyProgress, ProgressReporter};
use crate::store::{DocumentStore, SqliteStore};
use crate::transcription::{Transcriber, WhisperCliTranscriber};
use anyhow::Result as AnyResult;
use std::sync::Arc;
use std::time::Duration;

/// Run the ingest command.
pub async fn run_ingest(args: &IngestArgs, settings: Settings) -> AnyResult<()> {
    let json_events = args.progress == ProgressFormat::Json;

    match ingest(args, settings).await {
        Ok(report) => {
            if !json_events {
                Output::success("Ingestion complete");
                Output::kv("Videos converted", &report.videos_converted.to_string());
                Output::kv("Files transcribed", &report.files_transcribed.to_string());
                Output::kv("Chunks embedded", &report.chunks_embedded.to_string());
                Output::kv("Chunks stored", &report.chunks_stored.to_string());
            }
            Ok(())
        }
        Err(e) => {
            let message = e.to_string();
            if json_events {
                println!(
                    "{}",
                    serde_json::to_string(&ErrorEvent::new(&message))
                        .unwrap_or_else(|_| message.clone())
                );
            } else {
                Output::error(&message);
            }
            Err(e.into())
        }
    }
}

/// Apply CLI overrides, run pre-flight checks, and execute the pipeline.
async fn ingest(args: &IngestArgs, mut settings: Settings) -> Result<IngestReport> {
    apply_overrides(args, &mut settings);

    preflight::check(Operation::Ingest, &settings)?;

    let mut options = IngestOptions::from_settings(&settings, &args.course);
    options.collection_override = args.collection.clone();
    options.title_override = args.video_title.clone();
    options.number_override = args.video_number.clone();
    options.clean = args.clean;
    options.overwrite_audio = args.overwrite_audio;

    let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperCliTranscriber::with_config(
        &settings.transcription.binary,
        &settings.transcription.model,
        settings.transcription.device.as_deref(),
    ));

    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(
        &settings.embedding.endpoint,
        &settings.embedding.model,
        Duration::from_secs(settings.embedding.timeout_seconds),
    )?);

    let store: Option<Arc<dyn DocumentStore>> = if args.no_db {
        None
    } else {
        Some(Arc::new(SqliteStore::new(&settings.db_path())?))
    };

    let (reporter, pretty): (Arc<dyn ProgressReporter>, Option<Arc<PrettyProgress>>) =
        match args.progress {
            ProgressFormat::Json => (Arc::new(JsonProgress::new()), None),
            ProgressFormat::Pretty => {
                let bar = Arc::new(PrettyProgress::new());
                (bar.clone(), Some(bar))
            }
        };

    let pipeline =
        IngestPipeline::with_components(transcriber, embedder, store).with_reporter(reporter);

    let result = pipeline.run(&options).await;

    if let Some(bar) = pretty {
        bar.finish();
    }

    result
}

fn apply_overrides(args: &IngestArgs, settings: &mut Settings) {
    if let Some(dir) = &args.video_dir {
        settings.ingest.video_dir = dir.clone();
    }
    if let Some(dir) = &args.audio_dir {
        settings.ingest.audio_dir = dir.clone();
    }
    if let Some(dir) = &args.json_dir {
        settings.ingest.json_dir = dir.clone();
    }
    if let Some(dir) = &args.merged_json_dir {
        settings.ingest.merged_json_dir = dir.clone();
    }
    if let Some(path) = &args.embeddings_out {
        settings.ingest.embeddings_path = path.clone();
    }
    if let Some(path) = &args.index_out {
        settings.ingest.index_path = path.clone();
    }
    if let Some(path) = &args.video_index_out {
        settings.ingest.video_index_path = path.clone();
    }
    if let Some(model) = &args.model {
        settings.transcription.model = model.clone();
    }
    if let Some(device) = &args.device {
        settings.transcription.device = Some(device.clone());
    }
    if args.translate {
        settings.transcription.translate = true;
    }
    if let Some(language) = &args.language {
        settings.transcription.language = Some(language.clone());
    }
    if let Some(merge_size) = args.merge_size {
        settings.merge.merge_size = merge_size;
    }
    if let Some(db) = &args.db {
        settings.store.db_path = db.clone();
    }
}
