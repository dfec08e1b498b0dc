//! Global Constants
//!
//! Centralized constants for scoring, detection and pipeline tuning.
//! All magic numbers should be defined here with documentation.

/// Pattern detection constants
pub mod detection {
    /// Characters captured on each side of a match for evidence windows
    pub const EVIDENCE_RADIUS: usize = 60;

    /// Maximum evidence snippets kept per category
    pub const MAX_EVIDENCE_PER_CATEGORY: usize = 8;

    /// Score impact per matched rule, by severity
    pub mod impact {
        pub const CRITICAL: i32 = -25;
        pub const HIGH: i32 = -15;
        pub const MEDIUM: i32 = -8;
        pub const LOW: i32 = -3;
    }

    /// Per-category impact floors (no single category can zero the score)
    pub mod floor {
        pub const SARCASM: i32 = -30;
        pub const DISENGAGEMENT: i32 = -30;
        pub const PUBLIC_SHAMING: i32 = -35;
        pub const EXCLUSION: i32 = -30;
        pub const AGGRESSION: i32 = -35;
    }
}

/// Context/hypocrisy constants
pub mod context {
    /// Multiplier for topic/behavior pairs not listed explicitly
    pub const DEFAULT_MULTIPLIER: f64 = 1.5;

    /// Multiplier at or above which a contradiction escalates one severity level
    pub const ESCALATION_MULTIPLIER: f64 = 2.0;
}

/// Compliance scoring constants
pub mod compliance {
    pub const BASE_SCORE: i32 = 50;
    pub const MENTION_POINTS: i32 = 5;
    pub const MENTION_CAP: i32 = 20;
    pub const PREVENTIVE_BONUS: i32 = 15;
    pub const PRACTICED_PENALTY: i32 = 15;
    pub const VIOLATION_PENALTY: i32 = 10;
    pub const GRAVE_VIOLATION_PENALTY: i32 = 30;

    /// Weight of the statute score in the combined score
    pub const STATUTE_WEIGHT: f64 = 0.6;
    /// Weight of the hypocrisy score in the combined score
    pub const HYPOCRISY_WEIGHT: f64 = 0.4;

    /// Missing taxonomy items turned into recommendations
    pub const MAX_MISSING_RECOMMENDATIONS: usize = 3;
}

/// Rigor validation constants
pub mod rigor {
    pub const SAFETY_WEIGHT: f64 = 0.40;
    pub const HYPOCRISY_WEIGHT: f64 = 0.30;
    pub const COMPLIANCE_WEIGHT: f64 = 0.30;

    /// Default generative-minus-rigorous delta that raises a warning
    pub const DEFAULT_DISCREPANCY_THRESHOLD: i32 = 30;
}

/// Self-consistency constants
pub mod consistency {
    /// Upper bound on samples per call
    pub const MAX_SAMPLES: usize = 5;

    /// Successful samples required to build a consensus
    pub const MIN_SUCCESSFUL_SAMPLES: usize = 2;

    /// Default per-dimension deviation that counts as disagreement
    pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 15.0;

    /// Standard deviation (in score points) at which confidence reaches zero
    pub const CONFIDENCE_SPREAD: f64 = 40.0;

    /// Temperature raise applied to every sample
    pub const TEMPERATURE_BOOST: f32 = 0.2;

    /// Upper bound of the random temperature jitter
    pub const TEMPERATURE_JITTER: f32 = 0.3;
}

/// Pipeline constants
pub mod pipeline {
    /// Default bound on concurrent collaborator calls
    pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

    /// Default samples when self-consistency is enabled
    pub const DEFAULT_SAMPLES: usize = 3;

    /// Maximum transcript characters sent in a single prompt
    pub const MAX_TRANSCRIPT_CHARS: usize = 60_000;

    /// Preview length for the parse-failed sentinel
    pub const RAW_PREVIEW_CHARS: usize = 200;
}

/// Semantic cache and curriculum matching constants
pub mod cache {
    /// Cosine similarity required for a semantic cache hit
    pub const SIMILARITY_THRESHOLD: f32 = 0.95;

    /// Default curriculum matches returned
    pub const CURRICULUM_LIMIT: usize = 5;

    /// Default curriculum similarity floor
    pub const CURRICULUM_THRESHOLD: f32 = 0.75;

    /// Candidates fetched per lookup before namespace filtering
    pub const LOOKUP_CANDIDATES: usize = 16;

    /// Requests sampled above this temperature bypass the cache
    pub const MAX_CACHEABLE_TEMPERATURE: f32 = 0.45;
}

/// Collaborator call timeouts (seconds)
pub mod timeouts {
    /// Lightweight classification calls
    pub const CLASSIFICATION_SECS: u64 = 60;
    /// Ordinary single-topic calls
    pub const STANDARD_SECS: u64 = 120;
    /// Full multi-dimension analysis
    pub const ANALYSIS_SECS: u64 = 240;
    /// Final scoring call
    pub const SCORING_SECS: u64 = 180;
    /// Enrichment outputs
    pub const ENRICHMENT_SECS: u64 = 120;
    /// Audio transcription
    pub const TRANSCRIPTION_SECS: u64 = 300;
}

/// Retry constants for collaborator calls
pub mod retry {
    /// Default retries after the first attempt
    pub const DEFAULT_MAX_RETRIES: usize = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;
}
