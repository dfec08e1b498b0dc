//! Curriculum / competency matching
//!
//! Embeds lesson text and searches a vector store of curriculum
//! competencies (e.g. national curriculum skill codes).

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::ai::embedding::SharedEmbedder;
use crate::ai::vector::{SharedVectorStore, VectorMatch};
use crate::constants::cache;
use crate::types::{Result, truncate_chars};

/// Competency entry loaded into the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competency {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub area: Option<String>,
}

/// Matcher over a competency vector store
pub struct CurriculumMatcher {
    embedder: SharedEmbedder,
    store: SharedVectorStore,
    limit: usize,
    threshold: f32,
}

/// Max characters of lesson text embedded for matching
const MATCH_TEXT_CHARS: usize = 8_000;

impl CurriculumMatcher {
    pub fn new(embedder: SharedEmbedder, store: SharedVectorStore) -> Self {
        Self {
            embedder,
            store,
            limit: cache::CURRICULUM_LIMIT,
            threshold: cache::CURRICULUM_THRESHOLD,
        }
    }

    /// Embed and store competencies
    pub async fn load(&self, competencies: &[Competency]) -> Result<usize> {
        for competency in competencies {
            let embedding = self.embedder.embed(&competency.description).await?;
            self.store
                .upsert(
                    &competency.id,
                    embedding,
                    json!({
                        "description": competency.description,
                        "area": competency.area,
                    }),
                )
                .await?;
        }
        debug!(count = competencies.len(), "Loaded curriculum competencies");
        Ok(competencies.len())
    }

    /// Competencies matching `text`
    pub async fn match_text(
        &self,
        text: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<VectorMatch>> {
        let embedding = self
            .embedder
            .embed(truncate_chars(text, MATCH_TEXT_CHARS))
            .await?;
        self.store.search(&embedding, limit, threshold).await
    }

    /// Match with the configured limit and threshold
    pub async fn match_default(&self, text: &str) -> Result<Vec<VectorMatch>> {
        self.match_text(text, self.limit, self.threshold).await
    }
}
