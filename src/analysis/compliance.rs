//! Compliance Scorer
//!
//! Maps deterministic detections onto statute taxonomies. A lesson earns
//! credit for discussing violation types educationally (mentioned) and
//! for a preventive framing; it loses credit for every type the teacher
//! actually practices and for every violation, three times as much when
//! the violation contradicts the lesson's own topic.

use serde::{Deserialize, Serialize};

use crate::analysis::context::{ContextAnalyzer, ContextReport};
use crate::analysis::detection::{BehaviorReport, PatternDetector};
use crate::analysis::rules;
use crate::analysis::statutes::{Statute, ViolationType};
use crate::constants::compliance::*;
use crate::types::{BehaviorCategory, RiskLevel, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    Compliant,
    Partial,
    NonCompliant,
    Violation,
}

impl ComplianceLevel {
    pub const fn from_score(score: u8) -> Self {
        match score {
            80.. => ComplianceLevel::Compliant,
            60..=79 => ComplianceLevel::Partial,
            40..=59 => ComplianceLevel::NonCompliant,
            _ => ComplianceLevel::Violation,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ComplianceLevel::Compliant => "compliant",
            ComplianceLevel::Partial => "partial",
            ComplianceLevel::NonCompliant => "non_compliant",
            ComplianceLevel::Violation => "violation",
        }
    }
}

/// Preventive vs punitive framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    Preventive,
    Punitive,
    Neutral,
}

impl Approach {
    pub fn classify(preventive: usize, punitive: usize) -> Self {
        match preventive.cmp(&punitive) {
            std::cmp::Ordering::Greater => Approach::Preventive,
            std::cmp::Ordering::Less => Approach::Punitive,
            std::cmp::Ordering::Equal => Approach::Neutral,
        }
    }
}

/// Observed behavior constituting a statute violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub behavior: BehaviorCategory,
    pub violation_type: ViolationType,
    pub severity: Severity,
    /// Behavior contradicts the lesson's own topic
    pub grave: bool,
    pub penalty: i32,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatuteReport {
    pub statute: Statute,
    pub citation: String,
    pub compliance_level: ComplianceLevel,
    pub risk_level: RiskLevel,
    pub score: u8,
    pub mentioned_types: Vec<ViolationType>,
    pub practiced_types: Vec<ViolationType>,
    pub missing_types: Vec<ViolationType>,
    pub approach: Approach,
    pub preventive_count: usize,
    pub punitive_count: usize,
    pub violations: Vec<Violation>,
    pub recommendations: Vec<String>,
}

impl StatuteReport {
    pub fn has_grave_violation(&self) -> bool {
        self.violations.iter().any(|v| v.grave)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub statutes: Vec<StatuteReport>,
    /// Anti-bullying score blended with the hypocrisy score
    pub combined_score: u8,
    pub summary: String,
}

impl ComplianceReport {
    pub fn statute(&self, statute: Statute) -> Option<&StatuteReport> {
        self.statutes.iter().find(|s| s.statute == statute)
    }

    pub fn has_grave_violation(&self) -> bool {
        self.statutes.iter().any(StatuteReport::has_grave_violation)
    }
}

pub struct ComplianceScorer;

impl ComplianceScorer {
    /// Full compliance check from raw text
    pub fn check_compliance(text: &str) -> ComplianceReport {
        let behavior = PatternDetector::analyze_all(text);
        let context = ContextAnalyzer::analyze_with(text, &behavior);
        Self::check_with(text, &behavior, &context)
    }

    /// Compliance check reusing reports already computed for `text`
    pub fn check_with(
        text: &str,
        behavior: &BehaviorReport,
        context: &ContextReport,
    ) -> ComplianceReport {
        let preventive = rules::preventive_count(text);
        let punitive = rules::punitive_count(text);
        let digital = rules::mentions_digital_context(text);

        let statutes: Vec<StatuteReport> = Statute::ALL
            .iter()
            .map(|&statute| {
                Self::evaluate(statute, text, behavior, context, preventive, punitive, digital)
            })
            .collect();

        let anti_bullying_score = statutes
            .iter()
            .find(|s| s.statute == Statute::AntiBullying)
            .map_or(0, |s| s.score);

        let combined_score = (STATUTE_WEIGHT * anti_bullying_score as f64
            + HYPOCRISY_WEIGHT * context.hypocrisy_score as f64)
            .round()
            .clamp(0.0, 100.0) as u8;

        let summary = statutes
            .iter()
            .find(|s| s.statute == Statute::AntiBullying)
            .map(|s| {
                format!(
                    "{}: {} (score {}/100, {} violation(s)); combined score {}/100",
                    s.statute,
                    s.compliance_level.as_str(),
                    s.score,
                    s.violations.len(),
                    combined_score
                )
            })
            .unwrap_or_default();

        ComplianceReport {
            statutes,
            combined_score,
            summary,
        }
    }

    fn evaluate(
        statute: Statute,
        text: &str,
        behavior: &BehaviorReport,
        context: &ContextReport,
        preventive_count: usize,
        punitive_count: usize,
        digital_context: bool,
    ) -> StatuteReport {
        let mentioned_types = statute.mentioned_types(text);
        let missing_types: Vec<ViolationType> = statute
            .taxonomy()
            .into_iter()
            .filter(|t| !mentioned_types.contains(t))
            .collect();
        let approach = Approach::classify(preventive_count, punitive_count);

        let violations: Vec<Violation> = behavior
            .detected()
            .filter_map(|detection| {
                let violation_type = statute.map_behavior(detection.category, digital_context)?;
                let grave = context
                    .has_contradiction(detection.category, |topic| statute.is_grave_topic(topic));
                Some(Violation {
                    behavior: detection.category,
                    violation_type,
                    severity: detection.severity,
                    grave,
                    penalty: if grave {
                        GRAVE_VIOLATION_PENALTY
                    } else {
                        VIOLATION_PENALTY
                    },
                    evidence: detection.evidence.clone(),
                })
            })
            .collect();

        let mut practiced_types: Vec<ViolationType> =
            violations.iter().map(|v| v.violation_type).collect();
        practiced_types.sort();
        practiced_types.dedup();

        let mention_points = (MENTION_POINTS * mentioned_types.len() as i32).min(MENTION_CAP);
        let preventive_bonus = if approach == Approach::Preventive {
            PREVENTIVE_BONUS
        } else {
            0
        };
        let penalties: i32 = violations.iter().map(|v| v.penalty).sum();
        let raw = BASE_SCORE + mention_points + preventive_bonus
            - PRACTICED_PENALTY * practiced_types.len() as i32
            - penalties;
        let score = raw.clamp(0, 100) as u8;

        let grave = violations.iter().any(|v| v.grave);
        let compliance_level = if grave {
            ComplianceLevel::Violation
        } else {
            ComplianceLevel::from_score(score)
        };
        let risk_level = Self::risk_level(grave, practiced_types.len(), violations.len());

        let recommendations = Self::recommendations(
            statute,
            &practiced_types,
            &missing_types,
            approach,
            grave,
        );

        StatuteReport {
            statute,
            citation: statute.citation().to_string(),
            compliance_level,
            risk_level,
            score,
            mentioned_types,
            practiced_types,
            missing_types,
            approach,
            preventive_count,
            punitive_count,
            violations,
            recommendations,
        }
    }

    /// Decision table over practiced-type and violation counts
    pub fn risk_level(grave: bool, practiced: usize, violations: usize) -> RiskLevel {
        if grave {
            RiskLevel::Critical
        } else if practiced >= 3 || violations >= 4 {
            RiskLevel::High
        } else if practiced >= 2 || violations >= 2 {
            RiskLevel::Medium
        } else if practiced >= 1 || violations >= 1 {
            RiskLevel::Low
        } else {
            RiskLevel::None
        }
    }

    fn recommendations(
        statute: Statute,
        practiced: &[ViolationType],
        missing: &[ViolationType],
        approach: Approach,
        grave: bool,
    ) -> Vec<String> {
        let mut out: Vec<String> = practiced
            .iter()
            .map(|t| {
                format!(
                    "Stop {} intimidation observed in class ({})",
                    t.as_str().replace('_', " "),
                    statute.citation()
                )
            })
            .collect();

        out.extend(
            missing
                .iter()
                .take(MAX_MISSING_RECOMMENDATIONS)
                .map(|t| {
                    format!(
                        "Discuss {} intimidation with the class ({})",
                        t.as_str().replace('_', " "),
                        statute.citation()
                    )
                }),
        );

        if approach != Approach::Preventive {
            out.push(
                "Favor a preventive framing: open questions, empathy exercises, ways to ask for help"
                    .to_string(),
            );
        }
        if grave {
            out.push(format!(
                "Teacher conduct contradicts the lesson topic; review classroom conduct against {}",
                statute.citation()
            ));
        }
        out
    }
}
