//! Video to audio conversion.
//!
//! Turns a directory of lecture videos into mono MP3 tracks using ffmpeg,
//! inferring the episode number and title from each filename.

use crate::error::{LektorError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Video extensions the converter picks up.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm"];

/// Extract the episode number and title from a video filename.
///
/// The number is taken from a `Video 3` / `Video_3` style marker, the title
/// from bracket contents with spaces removed. Names that match neither fall
/// back to number "0" and the whole stem as title; parsing never fails.
pub fn extract_number_title(filename: &str) -> (String, String) {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let number_re = Regex::new(r"(?i)Video[_\s]*(\d+)").expect("valid regex");
    let title_re = Regex::new(r"\[([^\]]+)\]").expect("valid regex");

    let number = number_re
        .captures(stem)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "0".to_string());

    let title = title_re
        .captures(stem)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| stem.to_string());

    (number.trim().to_string(), title.replace(' ', "").trim().to_string())
}

/// A single planned conversion.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Source video path.
    pub source: PathBuf,
    /// Target MP3 path, named `{number}_{title}.mp3`.
    pub target: PathBuf,
}

/// List the videos in a directory and plan their conversions.
pub fn plan_conversions(video_dir: &Path, audio_dir: &Path) -> Result<Vec<ConversionJob>> {
    let mut jobs = Vec::new();

    for entry in std::fs::read_dir(video_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_video = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !is_video {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        let (number, title) = extract_number_title(&name);
        jobs.push(ConversionJob {
            source: path,
            target: audio_dir.join(format!("{}_{}.mp3", number, title)),
        });
    }

    Ok(jobs)
}

/// Convert every video in `video_dir` to an MP3 in `audio_dir`.
///
/// Fails up front if ffmpeg is unavailable; a failed conversion aborts the
/// run rather than skipping the file. `on_progress` is called after each
/// completed file with (done, total).
#[instrument(skip(on_progress), fields(video_dir = %video_dir.display()))]
pub async fn convert_videos_to_audio(
    video_dir: &Path,
    audio_dir: &Path,
    overwrite: bool,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<Vec<PathBuf>> {
    check_ffmpeg().await?;

    std::fs::create_dir_all(audio_dir)?;
    let jobs = plan_conversions(video_dir, audio_dir)?;
    info!("Found {} videos in {}", jobs.len(), video_dir.display());

    let total = jobs.len();
    let mut outputs = Vec::with_capacity(total);

    for (done, job) in jobs.into_iter().enumerate() {
        debug!("Converting {:?} -> {:?}", job.source, job.target);
        convert_one(&job.source, &job.target, overwrite).await?;
        outputs.push(job.target);
        on_progress(done + 1, total);
    }

    Ok(outputs)
}

/// Run a single ffmpeg conversion.
async fn convert_one(source: &Path, target: &Path, overwrite: bool) -> Result<()> {
    let mut command = Command::new("ffmpeg");
    if overwrite {
        command.arg("-y");
    }
    command
        .arg("-i")
        .arg(source)
        .arg("-vn")
        .arg("-loglevel")
        .arg("error")
        .arg(target)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let result = command.output().await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            Err(LektorError::MediaConvert(format!(
                "ffmpeg failed for {:?}: {}",
                source, stderr
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LektorError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(LektorError::MediaConvert(format!("ffmpeg error: {}", e))),
    }
}

/// Verify ffmpeg is on the PATH before starting any conversions.
async fn check_ffmpeg() -> Result<()> {
    let result = Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => Err(LektorError::ToolFailed(
            "ffmpeg is installed but not working correctly".to_string(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LektorError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(LektorError::ToolFailed(format!("ffmpeg: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_number_title() {
        let (number, title) = extract_number_title("Video_3_[Intro].mp4");
        assert_eq!(number, "3");
        assert_eq!(title, "Intro");

        let (number, title) = extract_number_title("Video 12 [CSS Grid Basics].mkv");
        assert_eq!(number, "12");
        assert_eq!(title, "CSSGridBasics");
    }

    #[test]
    fn test_extract_falls_back_to_stem() {
        let (number, title) = extract_number_title("lecture-recording.mp4");
        assert_eq!(number, "0");
        assert_eq!(title, "lecture-recording");
    }

    #[test]
    fn test_plan_conversions_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Video_1_[Intro].mp4"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let audio_dir = dir.path().join("audio");
        let jobs = plan_conversions(dir.path(), &audio_dir).unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target, audio_dir.join("1_Intro.mp3"));
    }
}
