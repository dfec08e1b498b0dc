//! Pipeline output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::{MetricsSummary, TokenUsage};
use crate::analysis::{BehaviorReport, ComplianceReport, ContextReport, RigorousScoreResult};
use crate::pipeline::consistency::{ConsensusResult, Disagreement};
use crate::pipeline::context::{AnalysisOutputs, LessonMetadata, ReadingOutputs};
use crate::pipeline::enrichment::Enrichment;
use crate::pipeline::phase::PhaseRecord;
use crate::types::RunId;

/// Per-phase generative outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseOutputs {
    pub reading: ReadingOutputs,
    pub analysis: AnalysisOutputs,
    /// Scoring result, or the consensus when self-consistency ran
    pub scoring: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfConsistencyInfo {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub requested_samples: usize,
    pub successful_samples: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disagreements: Vec<Disagreement>,
    /// Raw samples behind the consensus
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<Value>,
}

impl SelfConsistencyInfo {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            confidence: None,
            requested_samples: 1,
            successful_samples: 1,
            disagreements: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn from_consensus(consensus: &ConsensusResult) -> Self {
        Self {
            enabled: true,
            confidence: Some(consensus.confidence),
            requested_samples: consensus.requested_samples,
            successful_samples: consensus.successful_samples,
            disagreements: consensus.disagreements.clone(),
            samples: consensus.samples.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub usage: TokenUsage,
    pub self_consistency: SelfConsistencyInfo,
    pub lesson: LessonMetadata,
    pub phases: Vec<PhaseRecord>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSummary>,
}

/// Everything one successful run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub outputs: PhaseOutputs,
    pub behavior: BehaviorReport,
    pub context: ContextReport,
    pub compliance: ComplianceReport,
    pub rigor: RigorousScoreResult,
    /// `None` when enrichment is disabled
    pub enrichment: Option<Enrichment>,
    pub metadata: RunMetadata,
}

impl AnalysisReport {
    /// Score the generative analysis reported for itself
    pub fn generative_score(&self) -> Option<u8> {
        self.rigor.generative_score
    }

    pub fn has_discrepancy(&self) -> bool {
        self.rigor.warning.is_some()
    }
}
