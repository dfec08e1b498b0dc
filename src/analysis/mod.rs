//! Deterministic Transcript Analysis
//!
//! Rule-based analyzers that need no collaborator and cannot fail:
//!
//! - [`detection`]: behavior pattern detection, safety score, legal risk
//! - [`context`]: taught topics vs observed behaviors (hypocrisy score)
//! - [`compliance`]: statute taxonomy mapping and compliance scores
//! - [`rigor`]: rule-based score cross-check of a generative result
//!
//! Data flows one way: detection -> context -> compliance -> rigor.

pub mod compliance;
pub mod context;
pub mod detection;
pub mod rigor;
pub mod rules;
pub mod statutes;

pub use compliance::{
    Approach, ComplianceLevel, ComplianceReport, ComplianceScorer, StatuteReport, Violation,
};
pub use context::{ContextAnalyzer, ContextReport, Contradiction};
pub use detection::{BehaviorReport, Detection, PatternDetector};
pub use rigor::{DiscrepancyWarning, RigorValidator, RigorousScoreResult, ValidatedResult};
pub use statutes::{Statute, ViolationType};

use serde::{Deserialize, Serialize};

/// The three deterministic reports for one transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeterministicReports {
    pub behavior: BehaviorReport,
    pub context: ContextReport,
    pub compliance: ComplianceReport,
}

impl DeterministicReports {
    pub fn analyze(text: &str) -> Self {
        let behavior = PatternDetector::analyze_all(text);
        let context = ContextAnalyzer::analyze_with(text, &behavior);
        let compliance = ComplianceScorer::check_with(text, &behavior, &context);
        Self {
            behavior,
            context,
            compliance,
        }
    }
}
