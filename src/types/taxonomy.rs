//! Classroom Behavior Taxonomy
//!
//! Tagged enumerations shared by the deterministic analyzers and the
//! report types. Variant order is meaningful: it is the report order and,
//! for `Severity`/`RiskLevel`, the ranking.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::detection::{floor, impact};

// =============================================================================
// Severity
// =============================================================================

/// Severity of a matched rule or detection (`None < Low < Medium < High < Critical`)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Score impact contributed by one matched rule of this severity
    pub const fn impact(self) -> i32 {
        match self {
            Severity::Critical => impact::CRITICAL,
            Severity::High => impact::HIGH,
            Severity::Medium => impact::MEDIUM,
            Severity::Low => impact::LOW,
            Severity::None => 0,
        }
    }

    /// One level up, saturating at `Critical`
    pub const fn escalate(self) -> Self {
        match self {
            Severity::None => Severity::Low,
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High | Severity::Critical => Severity::Critical,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Risk Level
// =============================================================================

/// Legal risk classification
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Behavior Category
// =============================================================================

/// Observed teacher behavior categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorCategory {
    Sarcasm,
    Disengagement,
    PublicShaming,
    Exclusion,
    Aggression,
}

impl BehaviorCategory {
    /// All categories in report order
    pub const ALL: [BehaviorCategory; 5] = [
        BehaviorCategory::Sarcasm,
        BehaviorCategory::Disengagement,
        BehaviorCategory::PublicShaming,
        BehaviorCategory::Exclusion,
        BehaviorCategory::Aggression,
    ];

    /// Lowest total impact a single category may contribute
    pub const fn impact_floor(self) -> i32 {
        match self {
            BehaviorCategory::Sarcasm => floor::SARCASM,
            BehaviorCategory::Disengagement => floor::DISENGAGEMENT,
            BehaviorCategory::PublicShaming => floor::PUBLIC_SHAMING,
            BehaviorCategory::Exclusion => floor::EXCLUSION,
            BehaviorCategory::Aggression => floor::AGGRESSION,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BehaviorCategory::Sarcasm => "sarcasm",
            BehaviorCategory::Disengagement => "disengagement",
            BehaviorCategory::PublicShaming => "public_shaming",
            BehaviorCategory::Exclusion => "exclusion",
            BehaviorCategory::Aggression => "aggression",
        }
    }

    /// Human-readable label used in issues and recommendations
    pub const fn display_name(self) -> &'static str {
        match self {
            BehaviorCategory::Sarcasm => "Sarcasm or irony toward students",
            BehaviorCategory::Disengagement => "Dismissive remarks about disengaged students",
            BehaviorCategory::PublicShaming => "Public shaming or exposure of students",
            BehaviorCategory::Exclusion => "Exclusion of students from activities",
            BehaviorCategory::Aggression => "Verbal aggression or threats",
        }
    }
}

impl fmt::Display for BehaviorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Topic
// =============================================================================

/// Lesson topics recognized by the context analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Bullying,
    Cyberbullying,
    Respect,
    Empathy,
    Inclusion,
    Diversity,
    DigitalSafety,
}

impl Topic {
    pub const ALL: [Topic; 7] = [
        Topic::Bullying,
        Topic::Cyberbullying,
        Topic::Respect,
        Topic::Empathy,
        Topic::Inclusion,
        Topic::Diversity,
        Topic::DigitalSafety,
    ];

    /// Bullying and cyberbullying
    pub const fn is_bullying_family(self) -> bool {
        matches!(self, Topic::Bullying | Topic::Cyberbullying)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::Bullying => "bullying",
            Topic::Cyberbullying => "cyberbullying",
            Topic::Respect => "respect",
            Topic::Empathy => "empathy",
            Topic::Inclusion => "inclusion",
            Topic::Diversity => "diversity",
            Topic::DigitalSafety => "digital_safety",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::None);
    }

    #[test]
    fn test_severity_escalate_saturates() {
        assert_eq!(Severity::High.escalate(), Severity::Critical);
        assert_eq!(Severity::Critical.escalate(), Severity::Critical);
    }

    #[test]
    fn test_impacts_are_non_positive() {
        for sev in [
            Severity::None,
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            assert!(sev.impact() <= 0);
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&BehaviorCategory::PublicShaming).unwrap(),
            "\"public_shaming\""
        );
        assert_eq!(
            serde_json::to_string(&Topic::DigitalSafety).unwrap(),
            "\"digital_safety\""
        );
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
    }

    #[test]
    fn test_bullying_family() {
        assert!(Topic::Bullying.is_bullying_family());
        assert!(Topic::Cyberbullying.is_bullying_family());
        assert!(!Topic::Respect.is_bullying_family());
    }
}
