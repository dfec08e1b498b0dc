//! Text embeddings
//!
//! Used by the semantic cache and the curriculum matcher. The reference
//! implementation calls an OpenAI-compatible `/embeddings` endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::ai::provider::ProviderConfig;
use crate::ai::provider::openai::{DEFAULT_API_BASE, error_from_response, resolve_api_key};
use crate::types::{AuditError, ErrorClassifier, Result};

/// Embedding collaborator
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub type SharedEmbedder = Arc<dyn Embedder>;

/// OpenAI `/embeddings` client
pub struct OpenAiEmbedder {
    api_key: SecretString,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiEmbedder {
    pub fn new(config: &ProviderConfig, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuditError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: resolve_api_key(config.api_key.clone())?,
            api_base: config
                .api_base
                .clone()
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(model = %self.model, chars = text.len(), "Embedding text");

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| AuditError::Llm(ErrorClassifier::classify_transport(&e, "embeddings")))?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "embeddings").await);
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AuditError::LlmApi(format!("Failed to parse embedding response: {}", e)))?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AuditError::LlmApi("No embedding in response".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embedding_response() {
        let raw = r#"{"data":[{"embedding":[0.1,0.2,0.3],"index":0}],"model":"m"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data[0].embedding.len(), 3);
    }

    #[tokio::test]
    async fn test_letter_embedder_is_deterministic() {
        let e = testing::LetterEmbedder;
        assert_eq!(e.embed("abc").await.unwrap(), e.embed("ABC").await.unwrap());
    }
}
