//! Pattern Detection Engine
//!
//! Runs the behavior rule tables over a transcript and produces one
//! [`Detection`] per category plus the aggregate [`BehaviorReport`].
//! Pure and deterministic: identical text always yields identical output.

use serde::{Deserialize, Serialize};

use crate::analysis::rules::behavior_rules;
use crate::constants::detection::{EVIDENCE_RADIUS, MAX_EVIDENCE_PER_CATEGORY};
use crate::types::{BehaviorCategory, RiskLevel, Severity, text_window};

/// Pattern-match result for one behavior category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub category: BehaviorCategory,
    pub detected: bool,
    pub severity: Severity,
    /// Surrounding text of each match, deduplicated, first-seen order
    pub evidence: Vec<String>,
    /// Sum of matched rule impacts, clamped to the category floor (always <= 0)
    pub score_impact: i32,
    /// Labels of the rules that matched
    pub matched_labels: Vec<String>,
}

impl Detection {
    /// Empty detection for a category
    pub fn none(category: BehaviorCategory) -> Self {
        Self {
            category,
            detected: false,
            severity: Severity::None,
            evidence: Vec::new(),
            score_impact: 0,
            matched_labels: Vec::new(),
        }
    }
}

/// All detections for one transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorReport {
    /// One entry per category, in [`BehaviorCategory::ALL`] order
    pub detections: Vec<Detection>,
    pub safety_score: u8,
    pub legal_risk: RiskLevel,
}

impl BehaviorReport {
    pub fn detection(&self, category: BehaviorCategory) -> Option<&Detection> {
        self.detections.iter().find(|d| d.category == category)
    }

    /// Detected categories only
    pub fn detected(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter().filter(|d| d.detected)
    }

    pub fn any_detected(&self) -> bool {
        self.detections.iter().any(|d| d.detected)
    }
}

/// Stateless behavior detector
pub struct PatternDetector;

impl PatternDetector {
    /// Detect one category
    pub fn detect(text: &str, category: BehaviorCategory) -> Detection {
        let mut detection = Detection::none(category);
        let mut total_impact = 0i32;

        for rule in behavior_rules(category) {
            let mut matched = false;
            for m in rule.regex.find_iter(text) {
                matched = true;
                if detection.evidence.len() >= MAX_EVIDENCE_PER_CATEGORY {
                    break;
                }
                let window = text_window(text, m.start(), m.end(), EVIDENCE_RADIUS);
                if !window.is_empty() && !detection.evidence.contains(&window) {
                    detection.evidence.push(window);
                }
            }

            // A rule counts once per transcript however often it matches
            if matched {
                detection.detected = true;
                detection.severity = detection.severity.max(rule.severity);
                detection.matched_labels.push(rule.label.to_string());
                total_impact += rule.severity.impact();
            }
        }

        detection.score_impact = total_impact.max(category.impact_floor());
        detection
    }

    /// Detect every category and derive the aggregate scores
    pub fn analyze_all(text: &str) -> BehaviorReport {
        let detections: Vec<Detection> = BehaviorCategory::ALL
            .iter()
            .map(|&category| Self::detect(text, category))
            .collect();

        let total: i32 = detections.iter().map(|d| d.score_impact).sum();
        let safety_score = (100 + total).clamp(0, 100) as u8;
        let legal_risk = Self::legal_risk(&detections);

        BehaviorReport {
            detections,
            safety_score,
            legal_risk,
        }
    }

    /// Severity-count threshold table
    pub fn legal_risk(detections: &[Detection]) -> RiskLevel {
        let count = |sev: Severity| detections.iter().filter(|d| d.severity == sev).count();
        let critical = count(Severity::Critical);
        let high = count(Severity::High);
        let medium = count(Severity::Medium);
        let low = count(Severity::Low);

        match (critical, high) {
            (c, _) if c >= 2 => RiskLevel::Critical,
            (1, _) => RiskLevel::High,
            (_, h) if h >= 2 => RiskLevel::High,
            (_, 1) => RiskLevel::Medium,
            _ if medium + low > 0 => RiskLevel::Low,
            _ => RiskLevel::None,
        }
    }
}
