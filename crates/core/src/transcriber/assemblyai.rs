//! AssemblyAI cloud transcription.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};

use super::config::AssemblyAiConfig;
use super::traits::{TranscriptSpan, Transcriber};
use crate::error::CollaboratorError;

const SERVICE: &str = "assemblyai";

/// Transcriber that uploads media to AssemblyAI and polls for the result.
pub struct AssemblyAiTranscriber {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    poll_interval: Duration,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranscriptStatus {
    id: String,
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentencesResponse {
    #[serde(default)]
    sentences: Vec<Sentence>,
}

/// Timestamps are in milliseconds.
#[derive(Debug, Deserialize)]
struct Sentence {
    start: u64,
    end: u64,
    text: String,
}

impl AssemblyAiTranscriber {
    pub fn new(api_key: impl Into<String>, config: &AssemblyAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CollaboratorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CollaboratorError::from_status(SERVICE, status.as_u16(), &body))
    }

    async fn upload(&self, media_path: &Path) -> Result<String, CollaboratorError> {
        let bytes = tokio::fs::read(media_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CollaboratorError::fatal(format!("media not found: {}", media_path.display()))
            } else {
                CollaboratorError::disk(media_path, e)
            }
        })?;

        debug!(bytes = bytes.len(), "Uploading media to AssemblyAI");
        let response = self
            .client
            .post(format!("{}/v2/upload", self.api_base))
            .header("authorization", &self.api_key)
            .body(bytes)
            .send()
            .await
            .map_err(|e| CollaboratorError::from_http(SERVICE, e))?;

        let upload: UploadResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| CollaboratorError::transient(SERVICE, e.to_string()))?;
        Ok(upload.upload_url)
    }

    async fn submit(&self, audio_url: &str) -> Result<String, CollaboratorError> {
        let response = self
            .client
            .post(format!("{}/v2/transcript", self.api_base))
            .header("authorization", &self.api_key)
            .json(&TranscriptRequest { audio_url })
            .send()
            .await
            .map_err(|e| CollaboratorError::from_http(SERVICE, e))?;

        let status: TranscriptStatus = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| CollaboratorError::transient(SERVICE, e.to_string()))?;
        Ok(status.id)
    }

    async fn wait_for_completion(&self, id: &str) -> Result<(), CollaboratorError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let response = self
                .client
                .get(format!("{}/v2/transcript/{}", self.api_base, id))
                .header("authorization", &self.api_key)
                .send()
                .await
                .map_err(|e| CollaboratorError::from_http(SERVICE, e))?;

            let status: TranscriptStatus = Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| CollaboratorError::transient(SERVICE, e.to_string()))?;

            match status.status.as_str() {
                "completed" => return Ok(()),
                // AssemblyAI reports undecodable audio through the error status.
                "error" => {
                    return Err(CollaboratorError::fatal(
                        status.error.unwrap_or_else(|| "transcription failed".to_string()),
                    ))
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(CollaboratorError::transient(
                    SERVICE,
                    format!("transcript {} not ready after {:?}", id, self.timeout),
                ));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn sentences(&self, id: &str) -> Result<Vec<TranscriptSpan>, CollaboratorError> {
        let response = self
            .client
            .get(format!("{}/v2/transcript/{}/sentences", self.api_base, id))
            .header("authorization", &self.api_key)
            .send()
            .await
            .map_err(|e| CollaboratorError::from_http(SERVICE, e))?;

        let body: SentencesResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| CollaboratorError::transient(SERVICE, e.to_string()))?;

        Ok(Self::to_spans(body.sentences))
    }

    fn to_spans(sentences: Vec<Sentence>) -> Vec<TranscriptSpan> {
        sentences
            .into_iter()
            .map(|s| {
                TranscriptSpan::new(
                    s.start as f64 / 1000.0,
                    s.end as f64 / 1000.0,
                    s.text.trim(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    fn name(&self) -> &str {
        "assemblyai"
    }

    async fn transcribe(&self, media_path: &Path) -> Result<Vec<TranscriptSpan>, CollaboratorError> {
        let audio_url = self.upload(media_path).await?;
        let id = self.submit(&audio_url).await?;
        info!(transcript_id = %id, "Submitted transcript");
        self.wait_for_completion(&id).await?;
        self.sentences(&id).await
    }

    async fn validate(&self) -> Result<(), CollaboratorError> {
        if self.api_key.trim().is_empty() {
            return Err(CollaboratorError::fatal("AssemblyAI API key is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentences_to_spans() {
        let json = r#"{
            "sentences": [
                {"start": 0, "end": 1850, "text": "First sentence.", "confidence": 0.9},
                {"start": 1850, "end": 4200, "text": " Second one. ", "confidence": 0.8}
            ]
        }"#;
        let body: SentencesResponse = serde_json::from_str(json).unwrap();
        let spans = AssemblyAiTranscriber::to_spans(body.sentences);

        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].end_seconds, 1.85);
        assert_eq!(spans[1].start_seconds, 1.85);
        assert_eq!(spans[1].text, "Second one.");
    }

    #[tokio::test]
    async fn test_validate_rejects_empty_key() {
        let transcriber = AssemblyAiTranscriber::new("  ", &AssemblyAiConfig::default());
        assert!(transcriber.validate().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_media_is_fatal() {
        let transcriber = AssemblyAiTranscriber::new("key", &AssemblyAiConfig::default());
        let err = transcriber
            .transcribe(Path::new("/definitely/not/here.m4a"))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
