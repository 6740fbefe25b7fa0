//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available before
//! starting operations that would otherwise fail midway. A failed check is
//! a configuration error: fatal, before any work happens.

use crate::config::Settings;
use crate::error::{LektorError, Result};
use std::process::Command;
use url::Url;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion requires the conversion and transcription tools plus a
    /// valid embedding endpoint.
    Ingest,
    /// Asking questions requires the API key and both endpoints.
    Ask,
    /// Listing courses only needs the database.
    Courses,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest => {
            check_tool("ffmpeg")?;
            check_tool(&settings.transcription.binary)?;
            check_endpoint("embedding.endpoint", &settings.embedding.endpoint)?;
        }
        Operation::Ask => {
            settings.answer.resolve_api_key()?;
            check_endpoint("embedding.endpoint", &settings.embedding.endpoint)?;
            check_endpoint("answer.endpoint", &settings.answer.endpoint)?;
        }
        Operation::Courses => {
            // No external requirements beyond the database itself.
        }
    }
    Ok(())
}

/// Check that a configured endpoint is a valid http(s) URL.
fn check_endpoint(name: &str, endpoint: &str) -> Result<()> {
    match Url::parse(endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(url) => Err(LektorError::Config(format!(
            "{} has unsupported scheme '{}': {}",
            name,
            url.scheme(),
            endpoint
        ))),
        Err(e) => Err(LektorError::Config(format!(
            "{} is not a valid URL ({}): {}",
            name, e, endpoint
        ))),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg uses -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(LektorError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LektorError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(LektorError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_courses_no_requirements() {
        // Listing courses should always pass pre-flight.
        assert!(check(Operation::Courses, &Settings::default()).is_ok());
    }

    #[test]
    fn test_check_endpoint_validation() {
        assert!(check_endpoint("test", "http://localhost:11434/api/embed").is_ok());
        assert!(check_endpoint("test", "https://openrouter.ai/api/v1/chat/completions").is_ok());
        assert!(check_endpoint("test", "not a url").is_err());
        assert!(check_endpoint("test", "file:///etc/passwd").is_err());
    }
}
