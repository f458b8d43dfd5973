//! Local transcription through the whisper command line tool.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::WhisperConfig;
use super::traits::{TranscriptSpan, Transcriber};
use crate::error::CollaboratorError;

const SERVICE: &str = "whisper";

/// Transcriber running `whisper --output_format json` in a scratch directory.
pub struct WhisperCliTranscriber {
    config: WhisperConfig,
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

impl WhisperCliTranscriber {
    pub fn new(config: WhisperConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, media_path: &Path, output_dir: &Path) -> Vec<String> {
        vec![
            media_path.to_string_lossy().to_string(),
            "--model".to_string(),
            self.config.model.clone(),
            "--language".to_string(),
            self.config.language.clone(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ]
    }

    /// Parses whisper's JSON output into spans.
    fn parse_output(json: &[u8]) -> Result<Vec<TranscriptSpan>, CollaboratorError> {
        let output: WhisperOutput = serde_json::from_slice(json)
            .map_err(|e| CollaboratorError::fatal(format!("unreadable whisper output: {}", e)))?;

        Ok(output
            .segments
            .into_iter()
            .map(|s| TranscriptSpan::new(s.start, s.end, s.text.trim()))
            .collect())
    }

    async fn run(&self, media_path: &Path, scratch: &Path) -> Result<Vec<TranscriptSpan>, CollaboratorError> {
        tokio::fs::create_dir_all(scratch)
            .await
            .map_err(|e| CollaboratorError::disk(scratch, e))?;

        let child = Command::new(&self.config.binary)
            .args(self.build_args(media_path, scratch))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CollaboratorError::fatal(format!(
                        "whisper not found at {}",
                        self.config.binary.display()
                    ))
                } else {
                    CollaboratorError::transient(SERVICE, e.to_string())
                }
            })?;

        let output = timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            CollaboratorError::transient(
                SERVICE,
                format!("timed out after {} seconds", self.config.timeout_secs),
            )
        })?
        .map_err(|e| CollaboratorError::transient(SERVICE, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().last().unwrap_or("whisper failed").to_string();
            // whisper decodes through ffmpeg; a non-zero exit almost always means bad media.
            return Err(CollaboratorError::fatal(reason));
        }

        let stem = media_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let json_path = scratch.join(format!("{}.json", stem));
        let json = tokio::fs::read(&json_path)
            .await
            .map_err(|e| CollaboratorError::disk(&json_path, e))?;

        Self::parse_output(&json)
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, media_path: &Path) -> Result<Vec<TranscriptSpan>, CollaboratorError> {
        if !media_path.exists() {
            return Err(CollaboratorError::fatal(format!(
                "media not found: {}",
                media_path.display()
            )));
        }

        let scratch: PathBuf =
            std::env::temp_dir().join(format!("rtt-whisper-{}", uuid::Uuid::new_v4()));
        debug!(media = %media_path.display(), model = %self.config.model, "Running whisper");

        let result = self.run(media_path, &scratch).await;

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %scratch.display(), error = %e, "Failed to remove whisper scratch dir");
            }
        }

        result
    }

    async fn validate(&self) -> Result<(), CollaboratorError> {
        let status = Command::new(&self.config.binary)
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|_| {
                CollaboratorError::fatal(format!(
                    "whisper not found at {}",
                    self.config.binary.display()
                ))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(CollaboratorError::fatal("whisper --help exited with an error"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        let json = br#"{
            "text": " Hello there. General Kenobi.",
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.5, "text": " Hello there."},
                {"id": 1, "start": 1.5, "end": 3.25, "text": " General Kenobi."}
            ],
            "language": "en"
        }"#;

        let spans = WhisperCliTranscriber::parse_output(json).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "Hello there.");
        assert_eq!(spans[1].start_seconds, 1.5);
        assert_eq!(spans[1].end_seconds, 3.25);
    }

    #[test]
    fn test_parse_garbage_is_fatal() {
        let err = WhisperCliTranscriber::parse_output(b"<html>").unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_media_is_fatal() {
        let transcriber = WhisperCliTranscriber::new(WhisperConfig::default());
        let err = transcriber
            .transcribe(Path::new("/definitely/not/here.m4a"))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_build_args() {
        let transcriber = WhisperCliTranscriber::new(WhisperConfig::default());
        let args = transcriber.build_args(Path::new("/m/audio.m4a"), Path::new("/tmp/out"));
        assert_eq!(args[0], "/m/audio.m4a");
        assert!(args.windows(2).any(|w| w[0] == "--output_format" && w[1] == "json"));
        assert!(args.windows(2).any(|w| w[0] == "--model" && w[1] == "large-v3"));
    }
}
