//! Pipeline progress reporting.
//!
//! The ingestion pipeline reports each step's fractional progress through a
//! [`ProgressReporter`]. The JSON reporter emits the newline-delimited
//! events consumed by calling processes; the pretty reporter renders a
//! progress bar for humans.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Instant;

/// One machine-readable progress event.
#[derive(Debug, Serialize)]
pub struct ProgressEvent<'a> {
    #[serde(rename = "type")]
    pub event: &'static str,
    /// Current pipeline step name.
    pub step: &'a str,
    /// Overall progress in 0..1.
    pub progress: f64,
    /// Seconds since the run started.
    pub elapsed_seconds: f64,
    /// Estimated seconds remaining, absent until progress is measurable.
    pub eta_seconds: Option<f64>,
}

/// Terminal error event emitted when a run fails.
#[derive(Debug, Serialize)]
pub struct ErrorEvent<'a> {
    #[serde(rename = "type")]
    pub event: &'static str,
    pub message: &'a str,
}

impl<'a> ErrorEvent<'a> {
    pub fn new(message: &'a str) -> Self {
        Self {
            event: "error",
            message,
        }
    }
}

/// Estimate remaining seconds from elapsed time and overall progress.
pub fn estimate_eta(elapsed_seconds: f64, progress: f64) -> Option<f64> {
    if progress > 0.0 && progress <= 1.0 {
        Some(elapsed_seconds * (1.0 - progress) / progress)
    } else {
        None
    }
}

/// Trait for progress reporting backends.
pub trait ProgressReporter: Send + Sync {
    /// Report overall progress (0..1) while running the named step.
    fn report(&self, step: &str, progress: f64);
}

/// Reporter emitting newline-delimited JSON events to stdout.
pub struct JsonProgress {
    started: Instant,
}

impl JsonProgress {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, step: &str, progress: f64) {
        let elapsed_seconds = self.started.elapsed().as_secs_f64();
        let event = ProgressEvent {
            event: "progress",
            step,
            progress,
            elapsed_seconds,
            eta_seconds: estimate_eta(elapsed_seconds, progress),
        };
        if let Ok(line) = serde_json::to_string(&event) {
            println!("{}", line);
        }
    }
}

/// Reporter rendering an indicatif progress bar.
pub struct PrettyProgress {
    bar: ProgressBar,
}

impl PrettyProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// Finish and clear the bar.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for PrettyProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for PrettyProgress {
    fn report(&self, step: &str, progress: f64) {
        self.bar.set_position((progress * 100.0).round() as u64);
        self.bar.set_message(step.to_string());
    }
}

/// Reporter that discards everything (for tests).
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn report(&self, _step: &str, _progress: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eta_estimation() {
        // Half done after 10 seconds leaves about 10 seconds.
        assert_eq!(estimate_eta(10.0, 0.5), Some(10.0));
        assert_eq!(estimate_eta(10.0, 1.0), Some(0.0));
        assert_eq!(estimate_eta(10.0, 0.0), None);
    }

    #[test]
    fn test_progress_event_shape() {
        let event = ProgressEvent {
            event: "progress",
            step: "transcribe",
            progress: 0.25,
            elapsed_seconds: 4.0,
            eta_seconds: estimate_eta(4.0, 0.25),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["step"], "transcribe");
        assert_eq!(json["progress"], 0.25);
        assert_eq!(json["eta_seconds"], 12.0);
    }

    #[test]
    fn test_error_event_shape() {
        let json = serde_json::to_value(ErrorEvent::new("ffmpeg missing")).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "ffmpeg missing");
    }
}
