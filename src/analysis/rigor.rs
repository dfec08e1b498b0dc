//! Rigor Validator
//!
//! Computes a deterministic "rigorous" score from the three rule-based
//! reports and compares it with the score the generative analysis reported
//! for itself. When the generative score is too generous the result is
//! annotated with a [`DiscrepancyWarning`]; the generative score itself is
//! never changed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::analysis::compliance::{ComplianceReport, ComplianceScorer};
use crate::analysis::context::{ContextAnalyzer, ContextReport};
use crate::analysis::detection::{BehaviorReport, PatternDetector};
use crate::constants::rigor::{
    COMPLIANCE_WEIGHT, DEFAULT_DISCREPANCY_THRESHOLD, HYPOCRISY_WEIGHT, SAFETY_WEIGHT,
};
use crate::types::{BehaviorCategory, Severity, as_number};

/// Fields checked, in order, for a generative self-reported score
pub const SCORE_FIELDS: [&str; 4] = ["overall_score", "score", "final_score", "nota_geral"];

/// Annotation attached when the generative score exceeds the rigorous one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscrepancyWarning {
    pub message: String,
    pub delta: i32,
    pub threshold: i32,
    /// Detected issues, most severe first
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigorousScoreResult {
    pub rigorous_score: u8,
    /// `None` when the generative result carries no recognizable score
    pub generative_score: Option<u8>,
    /// `generative - rigorous`
    pub delta: Option<i32>,
    pub warning: Option<DiscrepancyWarning>,
}

/// Generative result annotated with the deterministic reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedResult {
    pub generative: Value,
    pub behavior: BehaviorReport,
    pub context: ContextReport,
    pub compliance: ComplianceReport,
    pub rigor: RigorousScoreResult,
}

#[derive(Debug, Clone)]
pub struct RigorValidator {
    discrepancy_threshold: i32,
}

impl Default for RigorValidator {
    fn default() -> Self {
        Self::new(DEFAULT_DISCREPANCY_THRESHOLD)
    }
}

impl RigorValidator {
    pub fn new(discrepancy_threshold: i32) -> Self {
        Self {
            discrepancy_threshold,
        }
    }

    pub fn threshold(&self) -> i32 {
        self.discrepancy_threshold
    }

    /// Run every deterministic analyzer over `text` and validate `generative`
    pub fn validate(&self, text: &str, generative: &Value) -> ValidatedResult {
        let behavior = PatternDetector::analyze_all(text);
        let context = ContextAnalyzer::analyze_with(text, &behavior);
        let compliance = ComplianceScorer::check_with(text, &behavior, &context);
        let rigor = self.validate_reports(generative, &behavior, &context, &compliance);

        ValidatedResult {
            generative: generative.clone(),
            behavior,
            context,
            compliance,
            rigor,
        }
    }

    /// Compare a generative result with reports already computed for its transcript
    pub fn validate_reports(
        &self,
        generative: &Value,
        behavior: &BehaviorReport,
        context: &ContextReport,
        compliance: &ComplianceReport,
    ) -> RigorousScoreResult {
        let rigorous_score = rigorous_score(
            behavior.safety_score,
            context.hypocrisy_score,
            compliance.combined_score,
        );
        let generative_score = generative_score(generative);
        let delta = generative_score.map(|g| g as i32 - rigorous_score as i32);

        let warning = delta
            .filter(|&d| d > self.discrepancy_threshold)
            .map(|d| {
                let issues = issues(behavior, context, compliance);
                warn!(
                    delta = d,
                    rigorous = rigorous_score,
                    issues = issues.len(),
                    "Generative score exceeds rigorous score"
                );
                DiscrepancyWarning {
                    message: format!(
                        "Generative score {} exceeds rule-based score {} by {} points",
                        generative_score.unwrap_or_default(),
                        rigorous_score,
                        d
                    ),
                    delta: d,
                    threshold: self.discrepancy_threshold,
                    issues,
                    recommendations: recommendations(behavior, compliance),
                }
            });

        RigorousScoreResult {
            rigorous_score,
            generative_score,
            delta,
            warning,
        }
    }
}

/// Weighted blend of the three deterministic scores
pub fn rigorous_score(safety: u8, hypocrisy: u8, combined_compliance: u8) -> u8 {
    (SAFETY_WEIGHT * safety as f64
        + HYPOCRISY_WEIGHT * hypocrisy as f64
        + COMPLIANCE_WEIGHT * combined_compliance as f64)
        .round()
        .clamp(0.0, 100.0) as u8
}

/// Self-reported score on a 0-100 scale, unrounded
pub fn score_value(result: &Value) -> Option<f64> {
    let value = SCORE_FIELDS
        .iter()
        .find_map(|key| result.get(*key).filter(|v| !v.is_null()))?;
    let raw = as_number(value)?;

    // Floats in [0, 1] (including 1.0) are 0-1 scale; integers are already 0-100
    let written_as_float =
        value.is_f64() || value.as_str().is_some_and(|s| s.contains(['.', ',']));
    let scaled = if written_as_float && (0.0..=1.0).contains(&raw) {
        raw * 100.0
    } else {
        raw
    };
    Some(scaled.clamp(0.0, 100.0))
}

/// Self-reported score normalized to an integer 0-100
pub fn generative_score(result: &Value) -> Option<u8> {
    score_value(result).map(|s| s.round() as u8)
}

fn issues(
    behavior: &BehaviorReport,
    context: &ContextReport,
    compliance: &ComplianceReport,
) -> Vec<String> {
    let mut ranked: Vec<(Severity, String)> = Vec::new();

    for detection in behavior.detected() {
        let quote = detection
            .evidence
            .first()
            .map(|e| format!(": \"{}\"", e))
            .unwrap_or_default();
        ranked.push((
            detection.severity,
            format!(
                "{} ({}){}",
                detection.category.display_name(),
                detection.severity,
                quote
            ),
        ));
    }

    for c in &context.contradictions {
        ranked.push((
            c.severity,
            format!(
                "Lesson on {} contradicted by {} (penalty {})",
                c.topic, c.behavior, c.score_penalty
            ),
        ));
    }

    for statute in &compliance.statutes {
        for v in statute.violations.iter().filter(|v| v.grave) {
            ranked.push((
                Severity::Critical,
                format!(
                    "Grave {} violation of {}: {} conduct",
                    v.violation_type,
                    statute.statute,
                    v.behavior
                ),
            ));
        }
    }

    // Stable: equal severities keep discovery order
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    dedup(ranked.into_iter().map(|(_, issue)| issue))
}

fn recommendations(behavior: &BehaviorReport, compliance: &ComplianceReport) -> Vec<String> {
    let remediation = behavior.detected().map(|d| remediation(d.category).to_string());
    let statute_lines = compliance
        .statutes
        .iter()
        .flat_map(|s| s.recommendations.iter().cloned());
    dedup(remediation.chain(statute_lines))
}

fn remediation(category: BehaviorCategory) -> &'static str {
    match category {
        BehaviorCategory::Sarcasm => "Replace ironic remarks with direct, respectful feedback",
        BehaviorCategory::Disengagement => {
            "Re-engage inattentive students privately instead of commenting publicly"
        }
        BehaviorCategory::PublicShaming => {
            "Never expose grades, mistakes or personal matters in front of the class"
        }
        BehaviorCategory::Exclusion => "Keep every student included in the activity",
        BehaviorCategory::Aggression => "Use a calm tone; no insults, threats or shouting",
    }
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
