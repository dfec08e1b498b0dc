//! lessonaudit - Lesson Transcript Analysis
//!
//! Scores classroom lesson transcripts for pedagogical quality and
//! anti-bullying compliance by combining a phase-gated generative analysis
//! with deterministic, rule-based checks that keep it honest.
//!
//! ## Core Features
//!
//! - **Pattern Detection**: Weighted regex rules for harmful teacher behavior
//! - **Context Analysis**: Contradictions between what is taught and what is done
//! - **Compliance Scoring**: Lei 13.185/2015 and Lei 14.811/2024 articles
//! - **Rigor Validation**: Rule-based score cross-checked against the model's own
//! - **Self-Consistency**: Multi-sample scoring with consensus and confidence
//!
//! ## Quick Start
//!
//! ```ignore
//! use lessonaudit::{Config, LessonInput, Pipeline};
//! use lessonaudit::ai::{ProviderConfig, create_provider};
//!
//! let config = Config::default();
//! let provider = create_provider(&ProviderConfig::from(&config.llm))?;
//! let report = Pipeline::new(provider, &config)
//!     .run(LessonInput::new(transcript))
//!     .await?;
//! println!("rigorous: {}", report.rigor.rigorous_score);
//! ```
//!
//! ## Modules
//!
//! - [`analysis`]: Deterministic detection, context, compliance and rigor
//! - [`pipeline`]: Phase-gated orchestration and self-consistency
//! - [`ai`]: Collaborator traits, providers, caching and timeouts
//! - [`config`]: Layered configuration

pub mod ai;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::{AuditError, ErrorCategory, Result, RunId};

// =============================================================================
// Analysis Re-exports
// =============================================================================

pub use analysis::{
    BehaviorReport, ComplianceReport, ComplianceScorer, ContextAnalyzer, ContextReport,
    DeterministicReports, PatternDetector, RigorValidator, RigorousScoreResult,
};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    AnalysisReport, ConsensusResult, LessonInput, LessonMetadata, Pipeline, PipelineOptions,
    SelfConsistency,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    GenerationRequest, LlmProvider, LlmResponse, MetricsCollector, SharedMetrics, SharedProvider,
    TimeoutConfig, Transcriber, with_timeout,
};
