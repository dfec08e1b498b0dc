//! Statute descriptors
//!
//! Each statute defines a violation-type taxonomy (with descriptive
//! keywords used to recognize educational mentions) and a mapping from
//! observed behaviors to the types they constitute.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::analysis::rules::compile;
use crate::types::{BehaviorCategory, Topic};

/// Violation types across the supported statutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    Physical,
    Verbal,
    Moral,
    Sexual,
    Social,
    Psychological,
    Material,
    Virtual,
    PrivacyExposure,
    Grooming,
    Misinformation,
    DigitalFootprint,
}

impl ViolationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ViolationType::Physical => "physical",
            ViolationType::Verbal => "verbal",
            ViolationType::Moral => "moral",
            ViolationType::Sexual => "sexual",
            ViolationType::Social => "social",
            ViolationType::Psychological => "psychological",
            ViolationType::Material => "material",
            ViolationType::Virtual => "virtual",
            ViolationType::PrivacyExposure => "privacy_exposure",
            ViolationType::Grooming => "grooming",
            ViolationType::Misinformation => "misinformation",
            ViolationType::DigitalFootprint => "digital_footprint",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported statutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statute {
    /// Lei 13.185/2015 (Programa de Combate à Intimidação Sistemática)
    AntiBullying,
    /// Lei 14.811/2024 (intimidação sistemática virtual)
    InternetSafety,
}

type KeywordRow = (ViolationType, &'static str);

const ANTI_BULLYING_KEYWORDS: &[KeywordRow] = &[
    (
        ViolationType::Physical,
        r"\b(?:agress[aã]o f[ií]sica|empurr\w+|soco|chute|bater em)\b",
    ),
    (
        ViolationType::Verbal,
        r"\b(?:xing\w+|apelidos?\s+(?:pejorativ|ofensiv)\w*|insult\w+)",
    ),
    (
        ViolationType::Moral,
        r"\b(?:difama[çc][aã]o|cal[uú]nia|boatos?|fofocas?)\b",
    ),
    (
        ViolationType::Sexual,
        r"\b(?:ass[eé]dio sexual|abuso sexual|importuna[çc][aã]o)\b",
    ),
    (
        ViolationType::Social,
        r"\b(?:isolamento|isolar|exclus[aã]o social|deixar de fora)\b",
    ),
    (
        ViolationType::Psychological,
        r"\b(?:chantagem|manipula[çc][aã]o|humilha[çc][aã]o|amea[çc]as?|persegui[çc][aã]o)\b",
    ),
    (
        ViolationType::Material,
        r"\b(?:furtar|furto|roubar|destruir (?:o )?material|estragar (?:os )?pertences)\b",
    ),
    (
        ViolationType::Virtual,
        r"\b(?:cyberbullying|bullying virtual|mensagens ofensivas|redes sociais)\b",
    ),
];

const INTERNET_SAFETY_KEYWORDS: &[KeywordRow] = &[
    (
        ViolationType::Virtual,
        r"\b(?:cyberbullying|intimida[çc][aã]o (?:virtual|online)|ataques? (?:online|virtua(?:l|is)))\b",
    ),
    (
        ViolationType::PrivacyExposure,
        r"\b(?:privacidade|(?:expor|vazar|compartilhar) (?:fotos?|imagens?|dados|informa[çc][oõ]es))\b",
    ),
    (
        ViolationType::Grooming,
        r"\b(?:aliciamento|grooming|estranhos? (?:na internet|online))\b",
    ),
    (
        ViolationType::Misinformation,
        r"\b(?:fake news|desinforma[çc][aã]o|not[ií]cias? falsas?)\b",
    ),
    (
        ViolationType::DigitalFootprint,
        r"\b(?:pegada digital|rastro digital)\b",
    ),
];

fn compile_taxonomy(rows: &[KeywordRow]) -> Vec<(ViolationType, Regex)> {
    rows.iter()
        .filter_map(|(kind, pattern)| compile(pattern).map(|re| (*kind, re)))
        .collect()
}

static ANTI_BULLYING_TAXONOMY: LazyLock<Vec<(ViolationType, Regex)>> =
    LazyLock::new(|| compile_taxonomy(ANTI_BULLYING_KEYWORDS));
static INTERNET_SAFETY_TAXONOMY: LazyLock<Vec<(ViolationType, Regex)>> =
    LazyLock::new(|| compile_taxonomy(INTERNET_SAFETY_KEYWORDS));

impl Statute {
    pub const ALL: [Statute; 2] = [Statute::AntiBullying, Statute::InternetSafety];

    pub const fn name(self) -> &'static str {
        match self {
            Statute::AntiBullying => "Anti-bullying",
            Statute::InternetSafety => "Internet safety",
        }
    }

    pub const fn citation(self) -> &'static str {
        match self {
            Statute::AntiBullying => "Lei 13.185/2015",
            Statute::InternetSafety => "Lei 14.811/2024",
        }
    }

    /// Full violation-type taxonomy in declaration order
    pub fn taxonomy(self) -> Vec<ViolationType> {
        self.keyword_table().iter().map(|(kind, _)| *kind).collect()
    }

    fn keyword_table(self) -> &'static [KeywordRow] {
        match self {
            Statute::AntiBullying => ANTI_BULLYING_KEYWORDS,
            Statute::InternetSafety => INTERNET_SAFETY_KEYWORDS,
        }
    }

    fn compiled(self) -> &'static [(ViolationType, Regex)] {
        match self {
            Statute::AntiBullying => &ANTI_BULLYING_TAXONOMY,
            Statute::InternetSafety => &INTERNET_SAFETY_TAXONOMY,
        }
    }

    /// Types whose descriptive keywords occur in the text
    pub fn mentioned_types(self, text: &str) -> Vec<ViolationType> {
        self.compiled()
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Violation type constituted by a behavior, if any
    pub const fn map_behavior(
        self,
        behavior: BehaviorCategory,
        digital_context: bool,
    ) -> Option<ViolationType> {
        match (self, behavior) {
            (Statute::AntiBullying, BehaviorCategory::Aggression | BehaviorCategory::Sarcasm) => {
                Some(ViolationType::Verbal)
            }
            (Statute::AntiBullying, BehaviorCategory::PublicShaming) => {
                Some(ViolationType::Psychological)
            }
            (Statute::AntiBullying, BehaviorCategory::Exclusion) => Some(ViolationType::Social),
            (Statute::InternetSafety, BehaviorCategory::PublicShaming) => {
                Some(ViolationType::PrivacyExposure)
            }
            (Statute::InternetSafety, BehaviorCategory::Aggression) if digital_context => {
                Some(ViolationType::Virtual)
            }
            _ => None,
        }
    }

    /// Topics whose contradiction makes a violation of this statute grave
    pub const fn is_grave_topic(self, topic: Topic) -> bool {
        match self {
            Statute::AntiBullying => topic.is_bullying_family(),
            Statute::InternetSafety => {
                matches!(topic, Topic::DigitalSafety | Topic::Cyberbullying)
            }
        }
    }
}

impl fmt::Display for Statute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.citation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomies_compile() {
        assert_eq!(ANTI_BULLYING_TAXONOMY.len(), ANTI_BULLYING_KEYWORDS.len());
        assert_eq!(INTERNET_SAFETY_TAXONOMY.len(), INTERNET_SAFETY_KEYWORDS.len());
        assert_eq!(Statute::AntiBullying.taxonomy().len(), 8);
        assert_eq!(Statute::InternetSafety.taxonomy().len(), 5);
    }

    #[test]
    fn test_mentioned_types() {
        let text = "Xingar e espalhar boatos também é bullying, assim como o cyberbullying.";
        assert_eq!(
            Statute::AntiBullying.mentioned_types(text),
            vec![ViolationType::Verbal, ViolationType::Moral, ViolationType::Virtual]
        );
        assert_eq!(
            Statute::InternetSafety.mentioned_types(text),
            vec![ViolationType::Virtual]
        );
    }

    #[test]
    fn test_behavior_mapping() {
        let ab = Statute::AntiBullying;
        assert_eq!(ab.map_behavior(BehaviorCategory::Sarcasm, false), Some(ViolationType::Verbal));
        assert_eq!(
            ab.map_behavior(BehaviorCategory::PublicShaming, false),
            Some(ViolationType::Psychological)
        );
        assert_eq!(ab.map_behavior(BehaviorCategory::Disengagement, false), None);

        let is = Statute::InternetSafety;
        assert_eq!(is.map_behavior(BehaviorCategory::Aggression, false), None);
        assert_eq!(
            is.map_behavior(BehaviorCategory::Aggression, true),
            Some(ViolationType::Virtual)
        );
        assert_eq!(is.map_behavior(BehaviorCategory::Sarcasm, true), None);
    }

    #[test]
    fn test_grave_topics() {
        assert!(Statute::AntiBullying.is_grave_topic(Topic::Cyberbullying));
        assert!(!Statute::AntiBullying.is_grave_topic(Topic::Respect));
        assert!(Statute::InternetSafety.is_grave_topic(Topic::DigitalSafety));
        assert!(!Statute::InternetSafety.is_grave_topic(Topic::Bullying));
    }
}
