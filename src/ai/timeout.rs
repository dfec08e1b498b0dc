//! Unified Timeout Configuration
//!
//! Every collaborator call carries an explicit deadline. Values differ per
//! call type: lightweight classification calls are short, full multi-dimension
//! analysis is long. A timeout surfaces as `AuditError::Timeout`, which the
//! pipeline treats exactly like any other failed call.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::{CallKind, TimeoutConfig, with_timeout};
//!
//! let config = TimeoutConfig::default();
//! let result = with_timeout(
//!     config.for_kind(CallKind::Analysis),
//!     async { /* LLM call */ },
//!     "pedagogy"
//! ).await?;
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::constants::timeouts;
use crate::types::{AuditError, Result};

/// Collaborator call types with distinct deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Classification,
    Standard,
    Analysis,
    Scoring,
    Enrichment,
    Transcription,
}

/// Per-call-type timeouts, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Lightweight classification calls (default: 60s)
    pub classification_secs: u64,
    /// Ordinary single-topic calls (default: 120s)
    pub standard_secs: u64,
    /// Full multi-dimension analysis (default: 240s)
    pub analysis_secs: u64,
    /// Final scoring call (default: 180s)
    pub scoring_secs: u64,
    /// Best-effort enrichment outputs (default: 120s)
    pub enrichment_secs: u64,
    /// Audio transcription (default: 300s)
    pub transcription_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            classification_secs: timeouts::CLASSIFICATION_SECS,
            standard_secs: timeouts::STANDARD_SECS,
            analysis_secs: timeouts::ANALYSIS_SECS,
            scoring_secs: timeouts::SCORING_SECS,
            enrichment_secs: timeouts::ENRICHMENT_SECS,
            transcription_secs: timeouts::TRANSCRIPTION_SECS,
        }
    }
}

impl TimeoutConfig {
    /// Deadline for a call type
    pub fn for_kind(&self, kind: CallKind) -> Duration {
        let secs = match kind {
            CallKind::Classification => self.classification_secs,
            CallKind::Standard => self.standard_secs,
            CallKind::Analysis => self.analysis_secs,
            CallKind::Scoring => self.scoring_secs,
            CallKind::Enrichment => self.enrichment_secs,
            CallKind::Transcription => self.transcription_secs,
        };
        Duration::from_secs(secs.max(1))
    }

    /// Same deadline for every call type (tests, quick local runs)
    pub fn uniform(duration: Duration) -> Self {
        let secs = duration.as_secs().max(1);
        Self {
            classification_secs: secs,
            standard_secs: secs,
            analysis_secs: secs,
            scoring_secs: secs,
            enrichment_secs: secs,
            transcription_secs: secs,
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(AuditError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_config_defaults() {
        let config = TimeoutConfig::default();
        assert_eq!(config.for_kind(CallKind::Classification).as_secs(), 60);
        assert_eq!(config.for_kind(CallKind::Analysis).as_secs(), 240);
        assert!(config.for_kind(CallKind::Classification) < config.for_kind(CallKind::Analysis));
    }

    #[test]
    fn test_uniform() {
        let config = TimeoutConfig::uniform(Duration::from_secs(5));
        assert_eq!(config.for_kind(CallKind::Scoring).as_secs(), 5);
        assert_eq!(config.for_kind(CallKind::Transcription).as_secs(), 5);
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, AuditError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, AuditError>(42)
            },
            "slow operation",
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, AuditError::Timeout { .. }));
        assert!(err.to_string().contains("slow operation"));
    }
}
