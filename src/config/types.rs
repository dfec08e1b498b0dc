//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/lessonaudit/) and project (.lessonaudit/) level configuration.

use serde::{Deserialize, Serialize};

use crate::ai::timeout::TimeoutConfig;
use crate::constants::{cache, consistency, pipeline, retry, rigor};
use crate::types::{AuditError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Text-generation collaborator settings
    pub llm: LlmConfig,

    /// Orchestrator settings
    pub pipeline: PipelineConfig,

    /// Self-consistency aggregation settings
    pub consistency: ConsistencyConfig,

    /// Rigor validation settings
    pub rigor: RigorConfig,

    /// Semantic cache settings
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
            consistency: ConsistencyConfig::default(),
            rigor: RigorConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `AuditError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AuditError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(AuditError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(AuditError::Config(
                "LLM max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.max_concurrency == 0 {
            return Err(AuditError::Config(
                "pipeline.max_concurrency must be at least 1".to_string(),
            ));
        }

        if !(1..=consistency::MAX_SAMPLES).contains(&self.pipeline.self_consistency_samples) {
            return Err(AuditError::Config(format!(
                "pipeline.self_consistency_samples must be between 1 and {}, got {}",
                consistency::MAX_SAMPLES,
                self.pipeline.self_consistency_samples
            )));
        }

        if self.consistency.variance_threshold <= 0.0 {
            return Err(AuditError::Config(
                "consistency.variance_threshold must be greater than 0".to_string(),
            ));
        }

        if self.rigor.discrepancy_threshold <= 0 {
            return Err(AuditError::Config(
                "rigor.discrepancy_threshold must be greater than 0".to_string(),
            ));
        }

        if !(self.cache.similarity_threshold > 0.0 && self.cache.similarity_threshold <= 1.0) {
            return Err(AuditError::Config(format!(
                "cache.similarity_threshold must be in (0, 1], got {}",
                self.cache.similarity_threshold
            )));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// Supported text-generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Ollama,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            _ => Err(format!(
                "Unknown provider: {}. Valid values: openai, ollama",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider backend
    pub provider: ProviderKind,

    /// Model name
    pub model: String,

    /// Override for the provider base URL
    pub api_base: Option<String>,

    /// Default request timeout in seconds
    pub timeout_secs: u64,

    /// Base temperature (self-consistency samples raise it)
    pub temperature: f32,

    /// Maximum completion tokens per call
    pub max_tokens: u32,

    /// Retries after the first attempt for transient failures
    pub max_retries: usize,

    /// Model used for audio transcription
    pub transcription_model: String,

    /// Model used for embeddings (semantic cache, curriculum matching)
    pub embedding_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            timeout_secs: 120,
            temperature: 0.3,
            max_tokens: 4096,
            max_retries: retry::DEFAULT_MAX_RETRIES,
            transcription_model: "whisper-1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bound on concurrent collaborator calls (sub-tasks and samples share it)
    pub max_concurrency: usize,

    /// Route the scoring call through the self-consistency aggregator
    pub self_consistency_enabled: bool,

    /// Samples per self-consistency call (1..=5)
    pub self_consistency_samples: usize,

    /// Run the best-effort enrichment fan-out after scoring
    pub enrichment_enabled: bool,

    /// Per-call-type timeouts
    pub timeouts: TimeoutConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: pipeline::DEFAULT_MAX_CONCURRENCY,
            self_consistency_enabled: false,
            self_consistency_samples: pipeline::DEFAULT_SAMPLES,
            enrichment_enabled: true,
            timeouts: TimeoutConfig::default(),
        }
    }
}

// =============================================================================
// Analysis Thresholds
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// Max deviation from the mean (score points) before a field is a disagreement
    pub variance_threshold: f64,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            variance_threshold: consistency::DEFAULT_VARIANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigorConfig {
    /// Generative-minus-rigorous delta that raises a discrepancy warning
    pub discrepancy_threshold: i32,
}

impl Default for RigorConfig {
    fn default() -> Self {
        Self {
            discrepancy_threshold: rigor::DEFAULT_DISCREPANCY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Wrap the provider with the semantic cache
    pub enabled: bool,

    /// Cosine similarity required for a hit
    pub similarity_threshold: f32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            similarity_threshold: cache::SIMILARITY_THRESHOLD,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
        assert_eq!(config.consistency.variance_threshold, 15.0);
        assert_eq!(config.rigor.discrepancy_threshold, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert!("claude".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(matches!(config.validate(), Err(AuditError::Config(_))));

        let mut config = Config::default();
        config.pipeline.self_consistency_samples = 6;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.similarity_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rigor.discrepancy_threshold = 0;
        assert!(config.validate().is_err());
    }
}
