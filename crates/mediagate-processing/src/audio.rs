//! Audio track extraction from video files.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tempfile::TempPath;
use thiserror::Error;
use tokio::process::Command;

use crate::filename::split_extension;

/// Extension of every extracted track.
pub const AUDIO_EXTENSION: &str = "mp3";

const STDERR_TAIL: usize = 4096;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to create temporary output: {0}")]
    TempFile(#[source] io::Error),

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {status}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },
}

impl ExtractError {
    /// The tool's own error output, when it produced any.
    pub fn diagnostics(&self) -> String {
        match self {
            ExtractError::Failed { stderr, .. } => stderr.clone(),
            other => other.to_string(),
        }
    }
}

/// Pulls the audio stream out of a video file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Write the audio track of `video` to a fresh temporary file.
    ///
    /// The returned [`TempPath`] deletes the file when dropped, so a caller
    /// that bails out early leaves nothing behind.
    async fn extract_audio(&self, video: &Path) -> Result<TempPath, ExtractError>;

    fn tool_name(&self) -> &str;
}

/// [`AudioExtractor`] that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegAudioExtractor {
    ffmpeg_path: String,
    temp_dir: Option<PathBuf>,
}

impl FfmpegAudioExtractor {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            temp_dir: None,
        }
    }

    /// Create temporary outputs under `dir` instead of the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    fn temp_output(&self) -> io::Result<TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("audio-").suffix(".mp3");
        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file.into_temp_path())
    }
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract_audio(&self, video: &Path) -> Result<TempPath, ExtractError> {
        let output_path = self.temp_output().map_err(ExtractError::TempFile)?;

        let args = [
            "-y".to_string(),
            "-i".to_string(),
            video.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-acodec".to_string(),
            "libmp3lame".to_string(),
            output_path.to_string_lossy().to_string(),
        ];

        tracing::debug!(
            tool = %self.ffmpeg_path,
            input = %video.display(),
            output = %output_path.display(),
            "Extracting audio track"
        );

        // Dropping this future (client hangup) kills the child.
        let output = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                tool: self.ffmpeg_path.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL);
            tracing::warn!(
                tool = %self.ffmpeg_path,
                status = %output.status,
                stderr = %stderr,
                "Audio extraction failed"
            );
            return Err(ExtractError::Failed {
                tool: self.ffmpeg_path.clone(),
                status: output.status,
                stderr,
            });
        }

        Ok(output_path)
    }

    fn tool_name(&self) -> &str {
        &self.ffmpeg_path
    }
}

/// Last `max` bytes of `text`, cut on a char boundary.
fn tail(text: &str, max: usize) -> String {
    let trimmed = text.trim_end();
    if trimmed.len() <= max {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - max;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}

/// Name for the audio track derived from a video.
///
/// Uses the client's preferred name when given, else the stored video's
/// name, with the extension replaced by `-audio.mp3`. Falls back to a
/// timestamped name when neither yields a stem.
pub fn audio_file_name(preferred: Option<&str>, fallback: &Path) -> String {
    let base = preferred
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| fallback.file_name().and_then(|n| n.to_str()));

    match base.map(|b| split_extension(b).0.trim()) {
        Some(stem) if !stem.is_empty() => format!("{}-audio.{}", stem, AUDIO_EXTENSION),
        _ => format!("audio-{}.{}", chrono::Utc::now().timestamp(), AUDIO_EXTENSION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_name_prefers_client_name() {
        assert_eq!(
            audio_file_name(Some("Holiday.mov"), Path::new("/up/clip-1.mp4")),
            "Holiday-audio.mp3"
        );
        assert_eq!(
            audio_file_name(Some("  "), Path::new("/up/clip-1.mp4")),
            "clip-1-audio.mp3"
        );
        assert_eq!(
            audio_file_name(None, Path::new("/up/talk")),
            "talk-audio.mp3"
        );
    }

    #[test]
    fn audio_name_falls_back_to_timestamp() {
        let name = audio_file_name(None, Path::new("/"));
        assert!(name.starts_with("audio-"));
        assert!(name.ends_with(".mp3"));
    }

    #[test]
    fn tail_keeps_the_end() {
        assert_eq!(tail("short\n", 100), "short");
        assert_eq!(tail("0123456789", 4), "6789");
        assert_eq!(tail("ééé", 3), "é");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_leaves_no_output() {
        let scratch = tempfile::tempdir().unwrap();
        let video = scratch.path().join("broken.mp4");
        tokio::fs::write(&video, b"not really a video").await.unwrap();

        let outputs = tempfile::tempdir().unwrap();
        let extractor = FfmpegAudioExtractor::new("false").with_temp_dir(outputs.path());

        let err = extractor.extract_audio(&video).await.unwrap_err();
        assert!(matches!(err, ExtractError::Failed { .. }));
        assert_eq!(std::fs::read_dir(outputs.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_tool_is_a_spawn_error() {
        let outputs = tempfile::tempdir().unwrap();
        let extractor = FfmpegAudioExtractor::new("/nonexistent/ffmpeg-binary")
            .with_temp_dir(outputs.path());

        let err = extractor
            .extract_audio(Path::new("/nonexistent/in.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Spawn { .. }));
        assert!(err.diagnostics().contains("ffmpeg-binary"));
        assert_eq!(std::fs::read_dir(outputs.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_tool_returns_owned_temp_path() {
        let outputs = tempfile::tempdir().unwrap();
        let extractor = FfmpegAudioExtractor::new("true").with_temp_dir(outputs.path());

        let audio = extractor
            .extract_audio(Path::new("/does/not/matter.mp4"))
            .await
            .unwrap();
        assert!(audio.exists());
        assert_eq!(extractor.tool_name(), "true");

        drop(audio);
        assert_eq!(std::fs::read_dir(outputs.path()).unwrap().count(), 0);
    }
}
