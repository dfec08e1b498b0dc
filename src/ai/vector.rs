//! Vector-similarity store
//!
//! Collaborator interface for similarity search plus an in-memory
//! implementation backed by `DashMap` for local runs and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::types::{AuditError, Result};

/// One similarity hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

/// Vector-similarity collaborator
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Best matches with similarity `>= threshold`, highest first, at most `limit`
    async fn search(&self, embedding: &[f32], limit: usize, threshold: f32)
    -> Result<Vec<VectorMatch>>;

    /// Insert or replace an entry
    async fn upsert(&self, id: &str, embedding: Vec<f32>, payload: Value) -> Result<()>;
}

pub type SharedVectorStore = Arc<dyn VectorStore>;

/// Cosine similarity; 0.0 for empty, zero-norm or mismatched vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// In-memory vector store (brute-force cosine search)
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: DashMap<String, (Vec<f32>, Value)>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<VectorMatch>> {
        let mut matches: Vec<VectorMatch> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let (vector, payload) = entry.value();
                let score = cosine_similarity(embedding, vector);
                (score >= threshold).then(|| VectorMatch {
                    id: entry.key().clone(),
                    score,
                    payload: payload.clone(),
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn upsert(&self, id: &str, embedding: Vec<f32>, payload: Value) -> Result<()> {
        if embedding.is_empty() {
            return Err(AuditError::VectorStore(format!(
                "Refusing to store empty embedding for '{}'",
                id
            )));
        }
        self.entries.insert(id.to_string(), (embedding, payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_and_filters() {
        let store = InMemoryVectorStore::new();
        store.upsert("a", vec![1.0, 0.0], json!({"n": "a"})).await.unwrap();
        store.upsert("b", vec![0.9, 0.1], json!({"n": "b"})).await.unwrap();
        store.upsert("c", vec![0.0, 1.0], json!({"n": "c"})).await.unwrap();

        let hits = store.search(&[1.0, 0.0], 5, 0.5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "b");

        let limited = store.search(&[1.0, 0.0], 1, 0.0).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = InMemoryVectorStore::new();
        store.upsert("a", vec![1.0], json!(1)).await.unwrap();
        store.upsert("a", vec![1.0], json!(2)).await.unwrap();
        assert_eq!(store.len(), 1);
        let hits = store.search(&[1.0], 1, 0.0).await.unwrap();
        assert_eq!(hits[0].payload, json!(2));
    }

    #[tokio::test]
    async fn test_rejects_empty_embedding() {
        let store = InMemoryVectorStore::new();
        assert!(matches!(
            store.upsert("a", vec![], json!(null)).await,
            Err(AuditError::VectorStore(_))
        ));
    }
}
