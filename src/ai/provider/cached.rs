//! Semantic-cache decorator
//!
//! Serves near-identical prompts of the same task type from the cache.
//! Cache failures never fail the call: they are logged and the inner
//! provider is used directly. Sampled calls above the cacheable temperature
//! always go to the inner provider so self-consistency keeps its diversity.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{GenerationRequest, LlmProvider, LlmResponse, ResponseMetadata, SharedProvider};
use crate::ai::cache::{SemanticCache, namespace_for};
use crate::ai::embedding::SharedEmbedder;
use crate::constants::cache;
use crate::types::Result;

pub struct CachedProvider {
    inner: SharedProvider,
    embedder: SharedEmbedder,
    cache: Arc<SemanticCache>,
}

impl CachedProvider {
    pub fn new(inner: SharedProvider, embedder: SharedEmbedder, cache: Arc<SemanticCache>) -> Self {
        Self {
            inner,
            embedder,
            cache,
        }
    }
}

#[async_trait]
impl LlmProvider for CachedProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<LlmResponse> {
        if request.temperature > cache::MAX_CACHEABLE_TEMPERATURE {
            return self.inner.generate(request).await;
        }

        let namespace = namespace_for(&request.system_prompt);
        let embedding = match self.embedder.embed(&request.user_prompt).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "Embedding failed, bypassing semantic cache");
                return self.inner.generate(request).await;
            }
        };

        match self.cache.lookup(&namespace, &embedding).await {
            Ok(Some(text)) => {
                debug!(namespace = %namespace, "Serving response from semantic cache");
                return Ok(LlmResponse {
                    text,
                    usage: Default::default(),
                    timing: Default::default(),
                    metadata: ResponseMetadata {
                        model: self.inner.model().to_string(),
                        provider: self.inner.name().to_string(),
                        cached: true,
                    },
                });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Semantic cache lookup failed"),
        }

        let response = self.inner.generate(request).await?;
        if let Err(e) = self.cache.store(&namespace, embedding, &response.text).await {
            warn!(error = %e, "Failed to store response in semantic cache");
        }
        Ok(response)
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
    use crate::ai::embedding::testing::LetterEmbedder;
    use crate::ai::provider::mock::MockProvider;
    use crate::ai::vector::InMemoryVectorStore;

    fn setup() -> (Arc<MockProvider>, CachedProvider) {
        let mock = Arc::new(MockProvider::new(|_, call| Ok(format!("{{\"call\": {}}}", call))));
        let cache = Arc::new(SemanticCache::new(Arc::new(InMemoryVectorStore::new())));
        let provider = CachedProvider::new(mock.clone(), Arc::new(LetterEmbedder), cache);
        (mock, provider)
    }

    #[tokio::test]
    async fn test_second_identical_call_is_cached() {
        let (mock, provider) = setup();
        let req = GenerationRequest::new("score the lesson", "transcript text").with_temperature(0.2);

        let first = provider.generate(&req).await.unwrap();
        let second = provider.generate(&req).await.unwrap();

        assert_eq!(mock.calls(), 1);
        assert_eq!(first.text, second.text);
        assert!(second.metadata.cached);
    }

    #[tokio::test]
    async fn test_different_task_type_does_not_share() {
        let (mock, provider) = setup();
        let a = GenerationRequest::new("task a", "same prompt").with_temperature(0.2);
        let b = GenerationRequest::new("task b", "same prompt").with_temperature(0.2);

        provider.generate(&a).await.unwrap();
        let second = provider.generate(&b).await.unwrap();

        assert_eq!(mock.calls(), 2);
        assert!(!second.metadata.cached);
    }

    #[tokio::test]
    async fn test_sampled_calls_bypass_cache() {
        let (mock, provider) = setup();
        let req = GenerationRequest::new("s", "u").with_temperature(0.8);

        provider.generate(&req).await.unwrap();
        provider.generate(&req).await.unwrap();

        assert_eq!(mock.calls(), 2);
    }
}
