//! LLM Provider Abstraction
//!
//! Defines the `LlmProvider` trait: system prompt and user prompt in, free
//! text (expected to be a JSON object for structured calls) out. The core
//! treats the text as opaque; parsing and repair happen in
//! [`crate::ai::validation`].
//!
//! ## Modules
//!
//! - `openai`: OpenAI-compatible chat completions
//! - `ollama`: locally running Ollama models
//! - `retry`: exponential backoff for transient failures
//! - `cached`: semantic-cache decorator

mod cached;
mod ollama;
pub(crate) mod openai;
mod retry;

#[cfg(test)]
pub(crate) mod mock;

pub use cached::CachedProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use retry::{RetryConfig, RetryingProvider};

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{LlmConfig, ProviderKind};
use crate::constants::timeouts;
use crate::types::Result;

// =============================================================================
// Generation Request
// =============================================================================

/// One text-generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Deadline for the whole call, enforced by the caller and the HTTP client
    pub timeout: Duration,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.3,
            max_tokens: 4096,
            timeout: Duration::from_secs(timeouts::STANDARD_SECS),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

/// Complete LLM response including raw text and usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text (usually a JSON object)
    pub text: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
    /// Provider and model info
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    /// Create full response with all metrics
    pub fn with_metrics(
        text: impl Into<String>,
        usage: TokenUsage,
        timing: ResponseTiming,
        metadata: ResponseMetadata,
    ) -> Self {
        Self {
            text: text.into(),
            usage,
            timing,
            metadata,
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from OpenAI-style usage response
    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }
    }

    /// Create from Ollama-style usage response
    pub fn from_ollama(prompt_eval_count: u32, eval_count: u32) -> Self {
        Self {
            input_tokens: prompt_eval_count,
            output_tokens: eval_count,
        }
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            input_tokens: self.input_tokens.saturating_add(rhs.input_tokens),
            output_tokens: self.output_tokens.saturating_add(rhs.output_tokens),
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for TokenUsage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, u| acc + u)
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
    /// Served from the semantic cache
    pub cached: bool,
}

/// Shared LLM provider type for concurrent access across pipeline stages.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for LLM providers
///
/// API keys are never serialized and are redacted in debug output. Each
/// provider converts the key to `SecretString` internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Default request timeout in seconds
    pub timeout_secs: u64,
    /// API key (falls back to `OPENAI_API_KEY`)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Retries after the first attempt for transient failures
    pub max_retries: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for ProviderConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            provider: config.provider,
            model: Some(config.model.clone()),
            timeout_secs: config.timeout_secs,
            api_key: None,
            api_base: config.api_base.clone(),
            max_retries: config.max_retries,
        }
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// Text-generation collaborator
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one generation call
    ///
    /// Transport errors, non-2xx statuses and empty completions are errors;
    /// non-JSON text is returned as-is.
    async fn generate(&self, request: &GenerationRequest) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Create a shared provider from configuration, wrapped with retries
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    let retry = RetryConfig::with_max_retries(config.max_retries);
    let provider: SharedProvider = match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config.clone())?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(config.clone())?),
    };
    Ok(Arc::new(RetryingProvider::new(provider, retry)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_sum() {
        let total: TokenUsage = [TokenUsage::from_openai(10, 5), TokenUsage::from_ollama(1, 2)]
            .into_iter()
            .sum();
        assert_eq!(total.input_tokens, 11);
        assert_eq!(total.output_tokens, 7);
        assert_eq!(total.total(), 18);
    }

    #[test]
    fn test_provider_config_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!serde_json::to_string(&config).unwrap().contains("sk-secret"));
    }

    #[test]
    fn test_request_builder() {
        let req = GenerationRequest::new("sys", "user")
            .with_temperature(0.9)
            .with_max_tokens(100)
            .with_timeout(Duration::from_secs(7));
        assert_eq!(req.temperature, 0.9);
        assert_eq!(req.max_tokens, 100);
        assert_eq!(req.timeout, Duration::from_secs(7));
    }
}
