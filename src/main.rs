//! Lektor CLI entry point.

use anyhow::Result;
use clap::Parser;
use lektor::cli::{commands, Cli, Commands};
use lektor::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lektor={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Ingest(args) => {
            commands::run_ingest(args, settings).await?;
        }

        Commands::Ask {
            question,
            course,
            db,
            stream,
            top_k,
            model,
        } => {
            commands::run_ask(
                question,
                course,
                db.clone(),
                *stream,
                *top_k,
                model.clone(),
                settings,
            )
            .await?;
        }

        Commands::Courses { db } => {
            commands::run_courses(db.clone(), settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }
    }

    Ok(())
}
