//! Rule Registry
//!
//! Static pattern tables for behavior, topic and approach detection.
//! Rows are plain `&'static str` definitions, compiled once into
//! `LazyLock` statics (case-insensitive, Unicode-aware) and shared
//! read-only by every analyzer.
//!
//! Patterns target Brazilian Portuguese classroom speech.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use crate::types::{BehaviorCategory, Severity, Topic};

// =============================================================================
// Rule Definitions
// =============================================================================

/// Behavior rule definition for the registry
struct RuleDef {
    pattern: &'static str,
    severity: Severity,
    label: &'static str,
}

const fn rule(pattern: &'static str, severity: Severity, label: &'static str) -> RuleDef {
    RuleDef {
        pattern,
        severity,
        label,
    }
}

const SARCASM_RULES: &[RuleDef] = &[
    rule(r"\bvoc[eê] tem (?:essa|uma) mania\b", Severity::Critical, "mocking_habit"),
    rule(r"\bque g[eê]nio\b", Severity::High, "mock_genius"),
    rule(
        r"\bclaro que (?:voc[eê]|ele|ela) n[aã]o sabe\b",
        Severity::High,
        "mock_ignorance",
    ),
    rule(r"\bparab[eé]ns,? (?:hein|viu)\b", Severity::Medium, "ironic_praise"),
    rule(r"\bnossa,? que novidade\b", Severity::Medium, "ironic_surprise"),
    rule(
        r"\bcomo sempre,? (?:atrasad|errad|esquecid)\w*",
        Severity::Medium,
        "as_always",
    ),
    rule(r"\bde novo,? (?:n[eé]|hein)\b", Severity::Low, "again_huh"),
];

const DISENGAGEMENT_RULES: &[RuleDef] = &[
    rule(r"\bdormiu de novo\b", Severity::Critical, "asleep_again"),
    rule(
        r"\bj[aá] desisti (?:de voc[eê]s?|dele|dela)\b",
        Severity::High,
        "gave_up_on_student",
    ),
    rule(
        r"\bn[aã]o [eé] (?:problema|responsabilidade) minha\b",
        Severity::High,
        "not_my_problem",
    ),
    rule(
        r"\bfa(?:z|ça|çam) o que quiser(?:em)?\b",
        Severity::Medium,
        "do_whatever",
    ),
    rule(
        r"\bdeixa (?:ele|ela|eles|elas) (?:a[ií]|l[aá]|pra l[aá])\b",
        Severity::Medium,
        "leave_them_be",
    ),
    rule(r"\bperda de tempo\b", Severity::Low, "waste_of_time"),
];

const PUBLIC_SHAMING_RULES: &[RuleDef] = &[
    rule(
        r"\b(?:vamos|podem) rir d(?:ele|ela|o|a)\b",
        Severity::Critical,
        "invite_laughter",
    ),
    rule(
        r"\btirou (?:zero|nota baixa|a pior nota)\b",
        Severity::High,
        "expose_grade",
    ),
    rule(r"\bolhem (?:s[oó] )?(?:o que|isso)\b", Severity::High, "look_at_this"),
    rule(
        r"\btodo mundo (?:j[aá] )?sabe que (?:voc[eê]|ele|ela)\b",
        Severity::Medium,
        "everyone_knows",
    ),
    rule(r"\bna frente de (?:todos|todo mundo)\b", Severity::Low, "in_front_of_all"),
];

const EXCLUSION_RULES: &[RuleDef] = &[
    rule(
        r"\bvoc[eê] n[aã]o (?:[eé] bem-vind[oa]|faz parte)\b",
        Severity::Critical,
        "not_welcome",
    ),
    rule(r"\b(?:sai|saia|pode sair) da sala\b", Severity::High, "sent_out"),
    rule(
        r"\bvoc[eê] n[aã]o (?:vai|pode) participar\b",
        Severity::High,
        "barred_from_activity",
    ),
    rule(
        r"\bsenta (?:l[aá] )?(?:sozinh[oa]|no fundo)\b",
        Severity::Medium,
        "seated_apart",
    ),
    rule(
        r"\bningu[eé]m quer (?:fazer|ficar) (?:grupo )?com\b",
        Severity::Low,
        "nobody_wants",
    ),
];

const AGGRESSION_RULES: &[RuleDef] = &[
    rule(
        r"\b(?:eu )?vou (?:te |lhe )?(?:bater|quebrar|acabar com)\b",
        Severity::Critical,
        "physical_threat",
    ),
    rule(
        r"\b(?:burr[oa]|idiota|imbecil|retardad[oa]|est[uú]pid[oa])s?\b",
        Severity::High,
        "insult",
    ),
    rule(r"\bcal(?:a|e) a boca\b", Severity::High, "shut_up"),
    rule(r"\bsil[eê]ncio!{2,}", Severity::Medium, "shouted_order"),
    rule(r"\b(?:que saco|aff)\b", Severity::Low, "exasperation"),
];

const TOPIC_RULES: &[(&str, Topic)] = &[
    (r"\bbullying\b", Topic::Bullying),
    (r"\bintimida[çc][aã]o sistem[aá]tica\b", Topic::Bullying),
    (r"\bass[eé]dio escolar\b", Topic::Bullying),
    (r"\bcyberbullying\b", Topic::Cyberbullying),
    (r"\bbullying virtual\b", Topic::Cyberbullying),
    (r"\bintimida[çc][aã]o (?:virtual|online|digital)\b", Topic::Cyberbullying),
    (r"\brespeit\w*", Topic::Respect),
    (r"\bempatia\b", Topic::Empathy),
    (r"\b(?:se )?colocar no lugar d[oa] outr[oa]\b", Topic::Empathy),
    (r"\binclus[aã]o\b", Topic::Inclusion),
    (r"\bincluir\b", Topic::Inclusion),
    (r"\binclusiv[oa]s?\b", Topic::Inclusion),
    (r"\bdiversidade\b", Topic::Diversity),
    (r"\bdiferen[çc]as\b", Topic::Diversity),
    (r"\bseguran[çc]a (?:digital|na internet|online)\b", Topic::DigitalSafety),
    (r"\bprivacidade\b", Topic::DigitalSafety),
    (r"\bcidadania digital\b", Topic::DigitalSafety),
];

const PREVENTIVE_PATTERNS: &[&str] = &[
    r"\bo que voc[eê]s fariam\b",
    r"\bcomo (?:podemos|poder[ií]amos) (?:evitar|prevenir|ajudar)\b",
    r"\bcomo voc[eê]s se sentiriam\b",
    r"\bvamos conversar\b",
    r"\bpreven[çc][aã]o\b",
    r"\bprevenir\b",
    r"\bconscientiza[çc][aã]o\b",
    r"\bacolh\w+",
    r"\bpedir ajuda\b",
];

const PUNITIVE_PATTERNS: &[&str] = &[
    r"\bpuni[çc][aã]o\b",
    r"\bpunir\b",
    r"\bsuspens[aã]o\b",
    r"\bsuspens[oa]s?\b",
    r"\bexpuls\w+",
    r"\badvert[eê]ncia\b",
    r"\bcastigo\b",
    r"\b(?:vai|vou te mandar) pra diretoria\b",
];

const DIGITAL_CONTEXT: &str = r"\b(?:internet|online|redes? sociais?|whatsapp|instagram|tiktok|grupo da turma|celular|mensage(?:m|ns)|print|post(?:ar|ou|agem))\b";

// =============================================================================
// Compiled Tables
// =============================================================================

/// Compiled behavior rule
#[derive(Debug)]
pub struct Rule {
    pub regex: Regex,
    pub severity: Severity,
    pub label: &'static str,
}

/// Compiled topic rule
#[derive(Debug)]
pub struct TopicRule {
    pub regex: Regex,
    pub topic: Topic,
}

/// Compile a registry pattern (case-insensitive)
pub(crate) fn compile(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| tracing::error!(pattern, error = %e, "Invalid rule pattern skipped"))
        .ok()
}

fn compile_rules(defs: &[RuleDef]) -> Vec<Rule> {
    defs.iter()
        .filter_map(|def| {
            compile(def.pattern).map(|regex| Rule {
                regex,
                severity: def.severity,
                label: def.label,
            })
        })
        .collect()
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| compile(p)).collect()
}

static SARCASM: LazyLock<Vec<Rule>> = LazyLock::new(|| compile_rules(SARCASM_RULES));
static DISENGAGEMENT: LazyLock<Vec<Rule>> = LazyLock::new(|| compile_rules(DISENGAGEMENT_RULES));
static PUBLIC_SHAMING: LazyLock<Vec<Rule>> =
    LazyLock::new(|| compile_rules(PUBLIC_SHAMING_RULES));
static EXCLUSION: LazyLock<Vec<Rule>> = LazyLock::new(|| compile_rules(EXCLUSION_RULES));
static AGGRESSION: LazyLock<Vec<Rule>> = LazyLock::new(|| compile_rules(AGGRESSION_RULES));

static TOPICS: LazyLock<Vec<TopicRule>> = LazyLock::new(|| {
    TOPIC_RULES
        .iter()
        .filter_map(|(pattern, topic)| {
            compile(pattern).map(|regex| TopicRule {
                regex,
                topic: *topic,
            })
        })
        .collect()
});

static PREVENTIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| compile_all(PREVENTIVE_PATTERNS));
static PUNITIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| compile_all(PUNITIVE_PATTERNS));
static DIGITAL: LazyLock<Option<Regex>> = LazyLock::new(|| compile(DIGITAL_CONTEXT));

// =============================================================================
// Accessors
// =============================================================================

/// Ordered rules for a behavior category
pub fn behavior_rules(category: BehaviorCategory) -> &'static [Rule] {
    match category {
        BehaviorCategory::Sarcasm => &SARCASM,
        BehaviorCategory::Disengagement => &DISENGAGEMENT,
        BehaviorCategory::PublicShaming => &PUBLIC_SHAMING,
        BehaviorCategory::Exclusion => &EXCLUSION,
        BehaviorCategory::Aggression => &AGGRESSION,
    }
}

/// Ordered topic keyword rules
pub fn topic_rules() -> &'static [TopicRule] {
    &TOPICS
}

/// Occurrences of preventive-framing patterns
pub fn preventive_count(text: &str) -> usize {
    count_occurrences(&PREVENTIVE, text)
}

/// Occurrences of punitive-framing patterns
pub fn punitive_count(text: &str) -> usize {
    count_occurrences(&PUNITIVE, text)
}

/// True when the transcript talks about online spaces
pub fn mentions_digital_context(text: &str) -> bool {
    DIGITAL.as_ref().is_some_and(|re| re.is_match(text))
}

fn count_occurrences(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().map(|re| re.find_iter(text).count()).sum()
}
