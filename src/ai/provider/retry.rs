//! Retry decorator for transient collaborator failures
//!
//! Wraps any provider with exponential backoff (with jitter). Only errors
//! whose category is retryable (rate limit, network, transient server
//! errors) are retried; auth and bad-request failures surface immediately.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::warn;

use super::{GenerationRequest, LlmProvider, LlmResponse, SharedProvider};
use crate::constants::retry;
use crate::types::{AuditError, Result};

/// Backoff settings
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: retry::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(retry::BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry::MAX_DELAY_SECS),
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

/// Provider decorator that retries transient failures
pub struct RetryingProvider {
    inner: SharedProvider,
    config: RetryConfig,
}

impl RetryingProvider {
    pub fn new(inner: SharedProvider, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<LlmResponse> {
        if self.config.max_retries == 0 {
            return self.inner.generate(request).await;
        }

        let provider = self.inner.name().to_string();
        (|| self.inner.generate(request))
            .retry(self.config.backoff())
            .when(|err: &AuditError| err.is_retryable())
            .notify(|err: &AuditError, delay: Duration| {
                warn!(
                    provider = %provider,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying after transient failure"
                );
            })
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::mock::MockProvider;
    use crate::types::{ErrorCategory, LlmError};
    use std::sync::Arc;

    fn fast(max_retries: usize) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let mock = Arc::new(MockProvider::new(|_, call| {
            if call < 2 {
                Err(AuditError::Llm(LlmError::new(
                    ErrorCategory::Transient,
                    "503 overloaded",
                )))
            } else {
                Ok("{\"ok\": true}".to_string())
            }
        }));
        let provider = RetryingProvider::new(mock.clone(), fast(3));

        let response = provider
            .generate(&GenerationRequest::new("s", "u"))
            .await
            .unwrap();
        assert_eq!(response.text, "{\"ok\": true}");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_auth_errors_fail_fast() {
        let mock = Arc::new(MockProvider::new(|_, _| {
            Err(AuditError::Llm(LlmError::new(ErrorCategory::Auth, "401")))
        }));
        let provider = RetryingProvider::new(mock.clone(), fast(3));

        assert!(provider.generate(&GenerationRequest::new("s", "u")).await.is_err());
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let mock = Arc::new(MockProvider::new(|_, _| {
            Err(AuditError::Llm(LlmError::new(ErrorCategory::Network, "reset")))
        }));
        let provider = RetryingProvider::new(mock.clone(), fast(2));

        assert!(provider.generate(&GenerationRequest::new("s", "u")).await.is_err());
        assert_eq!(mock.calls(), 3);
    }
}
