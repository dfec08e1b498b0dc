//! CLI Common Utilities
//!
//! Shared configuration, provider wiring and input loading for commands.

use std::path::Path;
use std::sync::Arc;

use crate::ai::{
    CachedProvider, Competency, CurriculumMatcher, InMemoryVectorStore, OpenAiEmbedder,
    ProviderConfig, SemanticCache, SharedEmbedder, SharedProvider, create_provider,
};
use crate::config::{Config, ConfigLoader, ProviderKind};
use crate::types::{AuditError, Result};

/// Per-invocation overrides from command-line flags
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub samples: Option<usize>,
    pub no_enrichment: bool,
}

/// Command execution context
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
}

impl CommandContext {
    /// Load layered configuration and apply flag overrides
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let mut config = ConfigLoader::load()?;

        if let Some(provider) = &overrides.provider {
            config.llm.provider = provider
                .parse::<ProviderKind>()
                .map_err(AuditError::Config)?;
        }
        if let Some(model) = &overrides.model {
            config.llm.model = model.clone();
        }
        if let Some(samples) = overrides.samples {
            config.pipeline.self_consistency_enabled = samples > 1;
            config.pipeline.self_consistency_samples = samples;
        }
        if overrides.no_enrichment {
            config.pipeline.enrichment_enabled = false;
        }

        config.validate()?;
        Ok(Self { config })
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::from(&self.config.llm)
    }

    fn embedder(&self) -> Result<SharedEmbedder> {
        let embedder =
            OpenAiEmbedder::new(&self.provider_config(), self.config.llm.embedding_model.clone())?;
        Ok(Arc::new(embedder))
    }

    /// Text-generation provider, behind the semantic cache when enabled
    pub fn provider(&self) -> Result<SharedProvider> {
        let provider = create_provider(&self.provider_config())?;
        if !self.config.cache.enabled {
            return Ok(provider);
        }

        let cache = SemanticCache::new(Arc::new(InMemoryVectorStore::new()))
            .with_threshold(self.config.cache.similarity_threshold);
        Ok(Arc::new(CachedProvider::new(
            provider,
            self.embedder()?,
            Arc::new(cache),
        )))
    }

    /// Curriculum matcher loaded from a JSON list of competencies
    pub async fn curriculum(&self, path: &Path) -> Result<Arc<CurriculumMatcher>> {
        let raw = std::fs::read_to_string(path)?;
        let competencies: Vec<Competency> = serde_json::from_str(&raw)?;
        let matcher = CurriculumMatcher::new(self.embedder()?, Arc::new(InMemoryVectorStore::new()));
        matcher.load(&competencies).await?;
        Ok(Arc::new(matcher))
    }
}

/// Read a transcript file, rejecting empty input
pub fn read_transcript(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(AuditError::Config(format!(
            "Transcript is empty: {}",
            path.display()
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_transcript_rejects_blank() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();
        assert!(matches!(read_transcript(file.path()), Err(AuditError::Config(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Bom dia, turma.").unwrap();
        assert!(read_transcript(file.path()).unwrap().starts_with("Bom dia"));
    }
}
