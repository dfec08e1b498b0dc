//! Semantic response cache
//!
//! Responses are keyed by the embedding of the user prompt and partitioned
//! by a namespace (hash of the system prompt), so only calls of the same
//! task type can share an entry. A lookup hits when cosine similarity is at
//! least the configured threshold (0.95 by default).

use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::ai::vector::SharedVectorStore;
use crate::constants::cache;
use crate::types::Result;

/// Stable namespace for a system prompt
pub fn namespace_for(system_prompt: &str) -> String {
    let digest = Sha256::digest(system_prompt.as_bytes());
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

/// Semantic cache over a vector store
pub struct SemanticCache {
    store: SharedVectorStore,
    threshold: f32,
}

impl SemanticCache {
    pub fn new(store: SharedVectorStore) -> Self {
        Self {
            store,
            threshold: cache::SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Cached response text for a near-identical prompt in the same namespace
    pub async fn lookup(&self, namespace: &str, embedding: &[f32]) -> Result<Option<String>> {
        let candidates = self
            .store
            .search(embedding, cache::LOOKUP_CANDIDATES, self.threshold)
            .await?;

        let hit = candidates.into_iter().find(|m| {
            m.payload.get("namespace").and_then(|v| v.as_str()) == Some(namespace)
        });

        Ok(hit.and_then(|m| {
            debug!(id = %m.id, score = m.score, "Semantic cache hit");
            m.payload
                .get("response")
                .and_then(|v| v.as_str())
                .map(String::from)
        }))
    }

    /// Store a response
    pub async fn store(&self, namespace: &str, embedding: Vec<f32>, response: &str) -> Result<()> {
        let id = format!("{}:{}", namespace, uuid::Uuid::new_v4());
        self.store
            .upsert(
                &id,
                embedding,
                json!({ "namespace": namespace, "response": response }),
            )
            .await
    }
}
