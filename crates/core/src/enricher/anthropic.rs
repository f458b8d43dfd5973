//! Enrichment through the Anthropic Messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use super::config::EnricherConfig;
use super::traits::Enricher;
use crate::error::CollaboratorError;

const SERVICE: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

/// Enricher backed by a Claude model.
pub struct AnthropicEnricher {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    api_base: String,
}

impl AnthropicEnricher {
    pub fn new(api_key: impl Into<String>, config: &EnricherConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn prompt(text: &str, context: &str) -> String {
        format!(
            "You are an indexing assistant. Produce a short enriched version of the \
             following transcript segment that adds related concepts, synonyms, and \
             themes to make it more findable via semantic search. Preserve the original \
             meaning. Output ONLY the enriched version, nothing else.\n\n\
             Context: {}\n\nSegment: {}",
            context, text
        )
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl Enricher for AnthropicEnricher {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn enrich(&self, text: &str, context: &str) -> Result<String, CollaboratorError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: Self::prompt(text, context),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CollaboratorError::from_http(SERVICE, e))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(CollaboratorError::from_status(SERVICE, status, &message));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::transient(SERVICE, e.to_string()))?;

        let text = body
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(text.trim().to_string())
    }

    async fn validate(&self) -> Result<(), CollaboratorError> {
        if self.api_key.trim().is_empty() {
            return Err(CollaboratorError::fatal("Anthropic API key is empty"));
        }
        Ok(())
    }
}
