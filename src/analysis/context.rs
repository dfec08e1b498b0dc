//! Context/Hypocrisy Analyzer
//!
//! Cross-references what a lesson teaches (topics) against how the
//! teacher behaves (detections). Teaching about bullying while mocking a
//! student is a contradiction, weighted by a fixed topic x behavior table.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::analysis::detection::{BehaviorReport, PatternDetector};
use crate::analysis::rules::topic_rules;
use crate::constants::context::{DEFAULT_MULTIPLIER, ESCALATION_MULTIPLIER};
use crate::types::{BehaviorCategory, Severity, Topic};

use BehaviorCategory::{Aggression, Disengagement, Exclusion, PublicShaming, Sarcasm};

/// Evidence snippets carried into each contradiction
const CONTRADICTION_EVIDENCE: usize = 3;

/// A taught topic contradicted by an observed behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub topic: Topic,
    pub behavior: BehaviorCategory,
    pub severity: Severity,
    pub multiplier: f64,
    pub score_penalty: u32,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextReport {
    pub detected_topics: Vec<Topic>,
    /// Worst first
    pub contradictions: Vec<Contradiction>,
    pub hypocrisy_score: u8,
    pub teaching_about_topic: bool,
    pub practicing_violation: bool,
}

impl ContextReport {
    /// True when `behavior` contradicts any topic accepted by `topic_filter`
    pub fn has_contradiction(
        &self,
        behavior: BehaviorCategory,
        topic_filter: impl Fn(Topic) -> bool,
    ) -> bool {
        self.contradictions
            .iter()
            .any(|c| c.behavior == behavior && topic_filter(c.topic))
    }
}

/// Behaviors that contradict a topic
pub const fn contradicting_behaviors(topic: Topic) -> &'static [BehaviorCategory] {
    match topic {
        Topic::Bullying => &[Sarcasm, PublicShaming, Exclusion, Aggression],
        Topic::Cyberbullying => &[PublicShaming, Aggression, Sarcasm],
        Topic::Respect => &[Sarcasm, Aggression, PublicShaming],
        Topic::Empathy => &[Sarcasm, Aggression, PublicShaming, Exclusion],
        Topic::Inclusion => &[Exclusion, Disengagement],
        Topic::Diversity => &[Exclusion, Sarcasm],
        Topic::DigitalSafety => &[PublicShaming],
    }
}

/// Weight of a topic/behavior contradiction
pub fn multiplier(topic: Topic, behavior: BehaviorCategory) -> f64 {
    match (topic, behavior) {
        (Topic::Bullying, PublicShaming | Aggression) => 2.0,
        (Topic::Bullying, Sarcasm | Exclusion) | (Topic::Respect, Aggression) => 1.8,
        (Topic::Empathy, Sarcasm) => 1.6,
        _ => DEFAULT_MULTIPLIER,
    }
}

pub struct ContextAnalyzer;

impl ContextAnalyzer {
    /// Analyze a transcript from scratch
    pub fn analyze(text: &str) -> ContextReport {
        let behavior = PatternDetector::analyze_all(text);
        Self::analyze_with(text, &behavior)
    }

    /// Analyze reusing an existing behavior report for the same text
    pub fn analyze_with(text: &str, behavior: &BehaviorReport) -> ContextReport {
        let detected_topics = Self::detect_topics(text);

        let mut contradictions: Vec<Contradiction> = detected_topics
            .iter()
            .flat_map(|&topic| {
                contradicting_behaviors(topic)
                    .iter()
                    .filter_map(move |&category| {
                        behavior
                            .detection(category)
                            .filter(|d| d.detected)
                            .map(|d| (topic, d))
                    })
            })
            .map(|(topic, detection)| {
                let multiplier = multiplier(topic, detection.category);
                let severity = if multiplier >= ESCALATION_MULTIPLIER {
                    detection.severity.escalate()
                } else {
                    detection.severity
                };
                Contradiction {
                    topic,
                    behavior: detection.category,
                    severity,
                    multiplier,
                    score_penalty: (detection.score_impact.unsigned_abs() as f64 * multiplier)
                        .round() as u32,
                    evidence: detection
                        .evidence
                        .iter()
                        .take(CONTRADICTION_EVIDENCE)
                        .cloned()
                        .collect(),
                }
            })
            .collect();

        contradictions.sort_by_key(|c| (Reverse(c.score_penalty), c.topic, c.behavior));

        let total_penalty: u32 = contradictions.iter().map(|c| c.score_penalty).sum();
        let hypocrisy_score = 100u32.saturating_sub(total_penalty) as u8;

        ContextReport {
            teaching_about_topic: detected_topics.iter().any(|t| t.is_bullying_family()),
            practicing_violation: behavior.any_detected(),
            detected_topics,
            contradictions,
            hypocrisy_score,
        }
    }

    /// Topics mentioned in the text, in [`Topic::ALL`] order
    pub fn detect_topics(text: &str) -> Vec<Topic> {
        let rules = topic_rules();
        Topic::ALL
            .into_iter()
            .filter(|&topic| {
                rules
                    .iter()
                    .any(|r| r.topic == topic && r.regex.is_match(text))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_educational_bullying_without_behaviors() {
        let text = "Hoje vamos falar sobre bullying. O que vocês fariam se vissem \
                    um colega sendo zoado no recreio?";
        let report = ContextAnalyzer::analyze(text);
        assert_eq!(report.detected_topics, vec![Topic::Bullying]);
        assert!(report.teaching_about_topic);
        assert!(!report.practicing_violation);
        assert_eq!(report.hypocrisy_score, 100);
        assert!(report.contradictions.is_empty());
    }

    #[test]
    fn test_bullying_lesson_with_sarcasm() {
        let text = "Vamos falar de bullying. Você tem essa mania de chegar atrasado.";
        let report = ContextAnalyzer::analyze(text);
        assert_eq!(report.contradictions.len(), 1);

        let c = &report.contradictions[0];
        assert_eq!(c.topic, Topic::Bullying);
        assert_eq!(c.behavior, Sarcasm);
        assert_eq!(c.multiplier, 1.8);
        assert_eq!(c.severity, Severity::Critical);
        assert_eq!(c.score_penalty, 45);
        assert_eq!(report.hypocrisy_score, 55);
    }

    #[test]
    fn test_escalation_at_double_multiplier() {
        let text = "Bullying é sério. Olhem só o que ele escreveu.";
        let report = ContextAnalyzer::analyze(text);
        let c = &report.contradictions[0];
        assert_eq!(c.behavior, PublicShaming);
        assert_eq!(c.multiplier, 2.0);
        assert_eq!(c.severity, Severity::Critical);
        assert_eq!(c.score_penalty, 30);
    }

    #[test]
    fn test_behavior_outside_table_yields_no_contradiction() {
        // Disengagement does not contradict Bullying
        let text = "Hoje o tema é bullying. O Ivã dormiu de novo.";
        let report = ContextAnalyzer::analyze(text);
        assert!(report.practicing_violation);
        assert!(report.contradictions.is_empty());
        assert_eq!(report.hypocrisy_score, 100);
    }

    #[test]
    fn test_sorted_worst_first() {
        let text = "Falamos de respeito e bullying. Cala a boca! Que gênio.";
        let report = ContextAnalyzer::analyze(text);
        let penalties: Vec<u32> = report.contradictions.iter().map(|c| c.score_penalty).collect();
        let mut sorted = penalties.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(penalties, sorted);
        assert_eq!(report.contradictions[0].topic, Topic::Bullying);
    }

    #[test]
    fn test_multiplier_table() {
        assert_eq!(multiplier(Topic::Bullying, Aggression), 2.0);
        assert_eq!(multiplier(Topic::Respect, Aggression), 1.8);
        assert_eq!(multiplier(Topic::Empathy, Sarcasm), 1.6);
        assert_eq!(multiplier(Topic::Inclusion, Exclusion), DEFAULT_MULTIPLIER);
    }

    const PHRASES: &[&str] = &[
        "bullying",
        "respeito",
        "empatia",
        "inclusão",
        "diversidade",
        "privacidade",
        "cyberbullying",
        "Você tem essa mania",
        "dormiu de novo",
        "vamos rir dele",
        "sai da sala",
        "cala a boca",
    ];

    proptest! {
        #[test]
        fn prop_contradictions_respect_table(
            parts in proptest::sample::subsequence(PHRASES, 0..PHRASES.len()),
        ) {
            let text = parts.join(". ");
            let report = ContextAnalyzer::analyze(&text);
            prop_assert!(report.hypocrisy_score <= 100);
            for c in &report.contradictions {
                prop_assert!(contradicting_behaviors(c.topic).contains(&c.behavior));
                prop_assert!(report.detected_topics.contains(&c.topic));
            }
        }
    }
}
