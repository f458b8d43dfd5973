//! FFmpeg-based frame extractor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::FramesConfig;
use super::traits::{frame_file_name, FrameExtractor};
use crate::error::CollaboratorError;

const SERVICE: &str = "ffmpeg";

/// Extracts frames by running one `ffmpeg` process per timestamp.
pub struct FfmpegFrameExtractor {
    config: FramesConfig,
}

impl FfmpegFrameExtractor {
    pub fn new(config: FramesConfig) -> Self {
        Self { config }
    }

    /// Builds ffmpeg arguments for a single frame grab.
    fn build_args(&self, media_path: &Path, timestamp_ms: u64, output_path: &Path) -> Vec<String> {
        vec![
            "-ss".to_string(),
            format!("{:.3}", timestamp_ms as f64 / 1000.0),
            "-i".to_string(),
            media_path.to_string_lossy().to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            self.config.quality.to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            output_path.to_string_lossy().to_string(),
        ]
    }

    /// Confirms ffprobe can read a video stream from the input.
    async fn probe(&self, media_path: &Path) -> Result<(), CollaboratorError> {
        if !media_path.exists() {
            return Err(CollaboratorError::fatal(format!(
                "media not found: {}",
                media_path.display()
            )));
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=codec_type",
                "-of",
                "csv=p=0",
            ])
            .arg(media_path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CollaboratorError::fatal(format!(
                        "ffprobe not found at {}",
                        self.config.ffprobe_path.display()
                    ))
                } else {
                    CollaboratorError::transient(SERVICE, e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(CollaboratorError::fatal(format!(
                "ffprobe cannot read {}: {}",
                media_path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        if !String::from_utf8_lossy(&output.stdout).contains("video") {
            return Err(CollaboratorError::fatal(format!(
                "no video stream in {}",
                media_path.display()
            )));
        }

        Ok(())
    }

    /// Grabs one frame. `None` when ffmpeg could not produce an image.
    async fn grab(&self, media_path: &Path, timestamp_ms: u64, out_dir: &Path) -> Option<PathBuf> {
        let output_path = out_dir.join(frame_file_name(timestamp_ms));

        let child = Command::new(&self.config.ffmpeg_path)
            .args(self.build_args(media_path, timestamp_ms, &output_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, "Failed to spawn ffmpeg");
                return None;
            }
        };

        let result = timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() && output_path.exists() => Some(output_path),
            Ok(Ok(output)) => {
                debug!(
                    timestamp_ms,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "No frame decoded"
                );
                None
            }
            Ok(Err(e)) => {
                warn!(timestamp_ms, error = %e, "ffmpeg failed");
                None
            }
            Err(_) => {
                warn!(timestamp_ms, "ffmpeg timed out");
                None
            }
        }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn extract(
        &self,
        media_path: &Path,
        timestamps_ms: &[u64],
        out_dir: &Path,
    ) -> Result<BTreeMap<u64, PathBuf>, CollaboratorError> {
        self.probe(media_path).await?;

        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| CollaboratorError::disk(out_dir, e))?;

        let mut unique: Vec<u64> = timestamps_ms.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let frames: BTreeMap<u64, PathBuf> = stream::iter(unique)
            .map(|ts| async move { self.grab(media_path, ts, out_dir).await.map(|p| (ts, p)) })
            .buffer_unordered(self.config.max_parallel.max(1))
            .filter_map(|entry| async move { entry })
            .collect()
            .await;

        debug!(
            requested = timestamps_ms.len(),
            extracted = frames.len(),
            "Frame extraction finished"
        );
        Ok(frames)
    }

    async fn validate(&self) -> Result<(), CollaboratorError> {
        for binary in [&self.config.ffmpeg_path, &self.config.ffprobe_path] {
            let output = Command::new(binary)
                .arg("-version")
                .output()
                .await
                .map_err(|_| {
                    CollaboratorError::fatal(format!("{} not found", binary.display()))
                })?;
            if !output.status.success() {
                return Err(CollaboratorError::fatal(format!(
                    "{} -version exited with an error",
                    binary.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_args() {
        let extractor = FfmpegFrameExtractor::new(FramesConfig::default());
        let args = extractor.build_args(
            Path::new("/media/video.mp4"),
            83_250,
            Path::new("/frames/000083250.jpg"),
        );

        assert_eq!(args[0], "-ss");
        assert_eq!(args[1], "83.250");
        assert_eq!(args[3], "/media/video.mp4");
        assert!(args.windows(2).any(|w| w[0] == "-frames:v" && w[1] == "1"));
        assert!(args.windows(2).any(|w| w[0] == "-q:v" && w[1] == "2"));
        assert_eq!(args.last().unwrap(), "/frames/000083250.jpg");
    }

    #[test]
    fn test_frame_file_name() {
        assert_eq!(frame_file_name(0), "000000000.jpg");
        assert_eq!(frame_file_name(83_250), "000083250.jpg");
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let extractor = FfmpegFrameExtractor::new(FramesConfig::default());
        let dir = TempDir::new().unwrap();
        let err = extractor
            .extract(Path::new("/no/such/video.mp4"), &[0, 1000], dir.path())
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
