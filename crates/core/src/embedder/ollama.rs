//! Embeddings from a local Ollama server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use super::config::EmbedderConfig;
use super::traits::Embedder;
use crate::error::CollaboratorError;

const SERVICE: &str = "ollama";

/// Ollama API client for `/api/embed`.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbedderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
        }
    }

    fn first_embedding(response: EmbedResponse) -> Result<Vec<f32>, CollaboratorError> {
        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| CollaboratorError::transient(SERVICE, "response had no embeddings"))
    }

    /// Whether `available` (as listed by `/api/tags`) contains the model, with
    /// or without the implicit `:latest` tag.
    fn has_model(available: &[TagModel], model: &str) -> bool {
        available.iter().any(|m| {
            m.name == model || m.name.strip_suffix(":latest").is_some_and(|n| n == model)
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        let response = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&EmbedRequest {
                model: &self.model,
                input: vec![text],
            })
            .send()
            .await
            .map_err(|e| CollaboratorError::from_http(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::from_status(SERVICE, status.as_u16(), &body));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::transient(SERVICE, e.to_string()))?;
        Self::first_embedding(body)
    }

    async fn validate(&self) -> Result<(), CollaboratorError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.url))
            .send()
            .await
            .map_err(|e| {
                CollaboratorError::transient(
                    SERVICE,
                    format!("cannot reach Ollama at {}: {}", self.url, e),
                )
            })?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::transient(SERVICE, e.to_string()))?;

        if !Self::has_model(&tags.models, &self.model) {
            return Err(CollaboratorError::fatal(format!(
                "model {} is not pulled; run `ollama pull {}`",
                self.model, self.model
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_value(EmbedRequest {
            model: "nomic-embed-text",
            input: vec!["hello"],
        })
        .unwrap();
        assert_eq!(json["model"], "nomic-embed-text");
        assert_eq!(json["input"][0], "hello");
    }

    #[test]
    fn test_first_embedding() {
        let body: EmbedResponse =
            serde_json::from_str(r#"{"model":"m","embeddings":[[0.5,-1.0,2.0]]}"#).unwrap();
        assert_eq!(OllamaEmbedder::first_embedding(body).unwrap(), vec![0.5, -1.0, 2.0]);

        let empty: EmbedResponse = serde_json::from_str(r#"{"embeddings":[]}"#).unwrap();
        assert!(OllamaEmbedder::first_embedding(empty).unwrap_err().is_retryable());
    }

    #[test]
    fn test_has_model() {
        let models = vec![
            TagModel {
                name: "nomic-embed-text:latest".to_string(),
            },
            TagModel {
                name: "llama3:8b".to_string(),
            },
        ];
        assert!(OllamaEmbedder::has_model(&models, "nomic-embed-text"));
        assert!(OllamaEmbedder::has_model(&models, "llama3:8b"));
        assert!(!OllamaEmbedder::has_model(&models, "llama3"));
    }

    #[test]
    fn test_dimension_from_config() {
        let embedder = OllamaEmbedder::new(&EmbedderConfig {
            dimension: 384,
            ..Default::default()
        });
        assert_eq!(embedder.dimension(), 384);
    }
}
