//! yt-dlp based downloader implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::DownloaderConfig;
use super::traits::{ChannelEntry, ChannelLister, Downloader, MediaKind};
use crate::error::CollaboratorError;
use crate::job::JobSource;

const SERVICE: &str = "yt-dlp";

/// stderr fragments that mean retrying cannot help.
const FATAL_MARKERS: &[&str] = &[
    "Unsupported URL",
    "Video unavailable",
    "Private video",
    "This video has been removed",
    "is not a valid URL",
    "HTTP Error 404",
    "HTTP Error 403",
    "Requested format is not available",
];

/// Downloader backed by the yt-dlp command line tool.
pub struct YtDlpDownloader {
    config: DownloaderConfig,
}

impl YtDlpDownloader {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    fn source_url(source: &JobSource) -> Result<String, CollaboratorError> {
        match source {
            JobSource::LocalFile { path } => Err(CollaboratorError::fatal(format!(
                "local file {} is not downloadable",
                path.display()
            ))),
            other => Ok(other.locator()),
        }
    }

    fn format_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Audio => &self.config.audio_format,
            MediaKind::Video => &self.config.video_format,
        }
    }

    /// Builds yt-dlp arguments for one download.
    fn build_fetch_args(&self, url: &str, kind: MediaKind, dest_dir: &Path) -> Vec<String> {
        let template = dest_dir.join(format!("{}.%(ext)s", kind.as_str()));
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--no-part".to_string(),
            "-f".to_string(),
            self.format_for(kind).to_string(),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args.push(url.to_string());
        args
    }

    /// Runs yt-dlp and returns stdout, classifying failures.
    async fn run(&self, args: &[String]) -> Result<Vec<u8>, CollaboratorError> {
        let child = Command::new(&self.config.yt_dlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CollaboratorError::fatal(format!(
                        "yt-dlp not found at {}",
                        self.config.yt_dlp_path.display()
                    ))
                } else {
                    CollaboratorError::transient(SERVICE, e.to_string())
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = timeout(timeout_duration, child.wait_with_output())
            .await
            .map_err(|_| {
                CollaboratorError::transient(
                    SERVICE,
                    format!("timed out after {} seconds", self.config.timeout_secs),
                )
            })?
            .map_err(|e| CollaboratorError::transient(SERVICE, e.to_string()))?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Err(classify_failure(&stderr))
    }
}

/// Maps yt-dlp stderr to the error taxonomy.
fn classify_failure(stderr: &str) -> CollaboratorError {
    let last_error = stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .unwrap_or(stderr.trim())
        .to_string();

    if FATAL_MARKERS.iter().any(|m| stderr.contains(m)) {
        CollaboratorError::fatal(last_error)
    } else {
        CollaboratorError::transient(SERVICE, last_error)
    }
}

/// Finds the file yt-dlp produced for `kind` inside `dest_dir`.
async fn find_output(dest_dir: &Path, kind: MediaKind) -> Result<PathBuf, CollaboratorError> {
    let prefix = format!("{}.", kind.as_str());
    let mut entries = tokio::fs::read_dir(dest_dir)
        .await
        .map_err(|e| CollaboratorError::disk(dest_dir, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CollaboratorError::disk(dest_dir, e))?
    {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&prefix) && !name.ends_with(".part") && !name.ends_with(".ytdl") {
            return Ok(entry.path());
        }
    }

    Err(CollaboratorError::transient(
        SERVICE,
        format!("no {} file produced in {}", kind, dest_dir.display()),
    ))
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch(
        &self,
        source: &JobSource,
        kind: MediaKind,
        dest_dir: &Path,
    ) -> Result<PathBuf, CollaboratorError> {
        let url = Self::source_url(source)?;
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| CollaboratorError::disk(dest_dir, e))?;

        let args = self.build_fetch_args(&url, kind, dest_dir);
        debug!(url = %url, kind = %kind, "Running yt-dlp");
        self.run(&args).await?;

        find_output(dest_dir, kind).await
    }

    async fn validate(&self) -> Result<(), CollaboratorError> {
        self.run(&["--version".to_string()]).await.map(|_| ())
    }
}

#[async_trait]
impl ChannelLister for YtDlpDownloader {
    async fn list_channel(&self, channel_url: &str) -> Result<Vec<ChannelEntry>, CollaboratorError> {
        #[derive(Deserialize)]
        struct Playlist {
            #[serde(default)]
            entries: Vec<PlaylistEntry>,
        }

        #[derive(Deserialize)]
        struct PlaylistEntry {
            id: String,
            #[serde(default)]
            title: Option<String>,
        }

        let url = if channel_url.trim_end_matches('/').ends_with("/videos") {
            channel_url.to_string()
        } else {
            format!("{}/videos", channel_url.trim_end_matches('/'))
        };

        let stdout = self
            .run(&["--flat-playlist".to_string(), "-J".to_string(), url])
            .await?;

        let playlist: Playlist = serde_json::from_slice(&stdout).map_err(|e| {
            CollaboratorError::fatal(format!("unexpected yt-dlp playlist output: {}", e))
        })?;

        Ok(playlist
            .entries
            .into_iter()
            .map(|e| ChannelEntry {
                video_id: e.id,
                title: e.title.unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_fetch_args() {
        let downloader = YtDlpDownloader::new(DownloaderConfig::default());
        let args = downloader.build_fetch_args(
            "https://www.youtube.com/watch?v=abc",
            MediaKind::Audio,
            Path::new("/work/abc/media"),
        );
        assert_eq!(args[4], "bestaudio");
        assert_eq!(args[6], "/work/abc/media/audio.%(ext)s");
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn test_classify_failure() {
        let err = classify_failure("ERROR: [youtube] abc: Video unavailable");
        assert!(!err.is_retryable());

        let err = classify_failure("ERROR: Unable to download webpage: <urlopen error timed out>");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_local_source_is_rejected() {
        let downloader = YtDlpDownloader::new(DownloaderConfig::default());
        let dir = TempDir::new().unwrap();
        let source = JobSource::LocalFile {
            path: PathBuf::from("/videos/a.mp4"),
        };
        let err = downloader
            .fetch(&source, MediaKind::Audio, dir.path())
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_find_output_ignores_partials() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("audio.webm.part"), b"x").unwrap();
        std::fs::write(dir.path().join("audio.m4a"), b"x").unwrap();

        let found = find_output(dir.path(), MediaKind::Audio).await.unwrap();
        assert_eq!(found, dir.path().join("audio.m4a"));

        let err = find_output(dir.path(), MediaKind::Video).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
