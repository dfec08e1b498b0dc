//! Self-Consistency Aggregator
//!
//! Samples the same prompt several times at raised, jittered temperatures,
//! then merges the successful samples into one consensus object:
//!
//! - numbers, and strings holding numbers, are averaged
//! - strings and booleans are majority-voted (ties go to the first seen)
//! - arrays of dimension objects are grouped by their dimension key, each
//!   group is merged field by field and `status` is re-derived from the
//!   averaged `score`
//! - anything else is voted on its serialized form
//!
//! Confidence falls as the spread of the per-sample overall scores grows.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ai::{GenerationRequest, TokenUsage, is_parse_failed};
use crate::analysis::rigor::score_value;
use crate::constants::consistency::{
    CONFIDENCE_SPREAD, DEFAULT_VARIANCE_THRESHOLD, MAX_SAMPLES, MIN_SUCCESSFUL_SAMPLES,
    TEMPERATURE_BOOST, TEMPERATURE_JITTER,
};
use crate::pipeline::pool::join_all;
use crate::pipeline::tasks::TaskRunner;
use crate::types::{AuditError, Result, as_number};

/// Keys that identify an object as one scored dimension
pub const DIMENSION_KEYS: [&str; 4] = ["dimension", "key", "id", "name"];

/// Field reported for the overall-score disagreement
pub const OVERALL_FIELD: &str = "overall_score";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionStatus {
    Excellent,
    Good,
    NeedsImprovement,
    Critical,
}

impl DimensionStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Excellent
        } else if score >= 60.0 {
            Self::Good
        } else if score >= 40.0 {
            Self::NeedsImprovement
        } else {
            Self::Critical
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::NeedsImprovement => "needs_improvement",
            Self::Critical => "critical",
        }
    }
}

/// What to sample
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub operation: String,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Base temperature before the per-sample raise
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl PromptContext {
    pub fn from_request(operation: impl Into<String>, request: &GenerationRequest) -> Self {
        Self {
            operation: operation.into(),
            system_prompt: request.system_prompt.clone(),
            user_prompt: request.user_prompt.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            timeout: request.timeout,
        }
    }

    fn request(&self, temperature: f32) -> GenerationRequest {
        GenerationRequest::new(self.system_prompt.clone(), self.user_prompt.clone())
            .with_temperature(temperature)
            .with_max_tokens(self.max_tokens)
            .with_timeout(self.timeout)
    }
}

/// A field whose samples spread too far from their mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disagreement {
    pub field: String,
    pub values: Vec<f64>,
    pub mean: f64,
    pub max_deviation: f64,
}

/// Merged samples with agreement statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub consensus: Value,
    pub confidence: f64,
    pub disagreements: Vec<Disagreement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub consensus: Value,
    pub confidence: f64,
    pub disagreements: Vec<Disagreement>,
    pub requested_samples: usize,
    pub successful_samples: usize,
    /// Parsed successful samples, in dispatch order
    #[serde(default)]
    pub samples: Vec<Value>,
    pub usage: TokenUsage,
}

pub struct SelfConsistency {
    runner: TaskRunner,
    variance_threshold: f64,
}

impl SelfConsistency {
    pub fn new(runner: TaskRunner) -> Self {
        Self {
            runner,
            variance_threshold: DEFAULT_VARIANCE_THRESHOLD,
        }
    }

    pub fn with_variance_threshold(mut self, threshold: f64) -> Self {
        self.variance_threshold = threshold;
        self
    }

    /// Sample `ctx` up to five times concurrently and aggregate
    pub async fn run_samples(&self, ctx: &PromptContext, n: usize) -> Result<ConsensusResult> {
        let requested = n.clamp(1, MAX_SAMPLES);
        let temperatures = sample_temperatures(ctx.temperature, requested);
        debug!(operation = %ctx.operation, samples = requested, ?temperatures, "Sampling");

        let handles = temperatures
            .into_iter()
            .map(|temperature| {
                let runner = self.runner.clone();
                let request = ctx.request(temperature);
                let operation = ctx.operation.clone();
                self.runner.pool().spawn("sample", async move {
                    runner.call(&operation, &request).await
                })
            })
            .collect();

        let mut samples = Vec::with_capacity(requested);
        let mut usage = TokenUsage::default();
        for (index, (_, result)) in join_all(handles).await.into_iter().enumerate() {
            match result {
                Ok((value, sample_usage)) => {
                    usage += sample_usage;
                    if is_parse_failed(&value) {
                        warn!(operation = %ctx.operation, sample = index, "Sample unparseable, discarded");
                    } else {
                        samples.push(value);
                    }
                }
                Err(e) => {
                    warn!(operation = %ctx.operation, sample = index, error = %e, "Sample failed");
                }
            }
        }

        if samples.len() < MIN_SUCCESSFUL_SAMPLES {
            return Err(AuditError::InsufficientSamples {
                required: MIN_SUCCESSFUL_SAMPLES,
                successful: samples.len(),
                requested,
            });
        }

        let aggregate = aggregate(&samples, self.variance_threshold);
        info!(
            operation = %ctx.operation,
            successful = samples.len(),
            requested,
            confidence = aggregate.confidence,
            disagreements = aggregate.disagreements.len(),
            "Consensus reached"
        );

        Ok(ConsensusResult {
            consensus: aggregate.consensus,
            confidence: aggregate.confidence,
            disagreements: aggregate.disagreements,
            requested_samples: requested,
            successful_samples: samples.len(),
            samples,
            usage,
        })
    }
}

/// Raised and jittered temperatures, capped at 1.0
pub fn sample_temperatures(base: f32, n: usize) -> Vec<f32> {
    let mut rng = rand::rng();
    (0..n)
        .map(|_| (base + TEMPERATURE_BOOST + rng.random_range(0.0..TEMPERATURE_JITTER)).min(1.0))
        .collect()
}

/// Merge successful samples into one consensus object
pub fn aggregate(samples: &[Value], variance_threshold: f64) -> Aggregate {
    let objects: Vec<&Map<String, Value>> = samples.iter().filter_map(Value::as_object).collect();

    let mut keys: Vec<&str> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }

    let mut consensus = Map::new();
    let mut disagreements = Vec::new();

    for key in keys {
        let values: Vec<&Value> = objects.iter().filter_map(|o| o.get(key)).collect();
        let merged = match dimension_groups(&values) {
            Some(groups) => {
                let (merged, mut found) = merge_dimensions(groups, variance_threshold);
                disagreements.append(&mut found);
                merged
            }
            None => merge_values(&values),
        };
        consensus.insert(key.to_string(), merged);
    }

    let overall: Vec<f64> = samples.iter().filter_map(overall_score).collect();
    if let Some(d) = disagreement(OVERALL_FIELD, &overall, variance_threshold) {
        disagreements.insert(0, d);
    }

    Aggregate {
        consensus: Value::Object(consensus),
        confidence: confidence(samples, &overall),
        disagreements,
    }
}

fn confidence(samples: &[Value], overall: &[f64]) -> f64 {
    if overall.len() >= MIN_SUCCESSFUL_SAMPLES {
        let mean = mean(overall);
        let variance = overall.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / overall.len() as f64;
        let raw = (1.0 - variance.sqrt() / CONFIDENCE_SPREAD).clamp(0.0, 1.0);
        return (raw * 1000.0).round() / 1000.0;
    }
    // No comparable scores: only full agreement earns confidence
    match samples.split_first() {
        Some((first, rest)) if rest.iter().all(|s| s == first) => 1.0,
        _ => 0.5,
    }
}

/// Overall score of one sample, or the mean of its dimension scores
fn overall_score(sample: &Value) -> Option<f64> {
    if let Some(score) = score_value(sample) {
        return Some(score);
    }
    let scores: Vec<f64> = sample
        .as_object()?
        .values()
        .filter_map(Value::as_array)
        .flatten()
        .filter(|item| dimension_key(item).is_some())
        .filter_map(|item| item.get("score").and_then(as_number))
        .collect();
    (!scores.is_empty()).then(|| mean(&scores))
}

fn dimension_key(item: &Value) -> Option<String> {
    let object = item.as_object()?;
    DIMENSION_KEYS.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

type DimensionGroups<'a> = Vec<(String, Vec<&'a Map<String, Value>>)>;

/// Group dimension objects by key when every value is an array of them
fn dimension_groups<'a>(values: &[&'a Value]) -> Option<DimensionGroups<'a>> {
    let mut groups: DimensionGroups<'a> = Vec::new();
    for value in values {
        for item in value.as_array()? {
            let key = dimension_key(item)?;
            let object = item.as_object()?;
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(object),
                None => groups.push((key, vec![object])),
            }
        }
    }
    (!groups.is_empty()).then_some(groups)
}

fn merge_dimensions(groups: DimensionGroups<'_>, variance_threshold: f64) -> (Value, Vec<Disagreement>) {
    let mut merged = Vec::with_capacity(groups.len());
    let mut disagreements = Vec::new();

    for (key, members) in groups {
        let mut fields: Vec<&str> = Vec::new();
        for member in &members {
            for field in member.keys() {
                if !fields.contains(&field.as_str()) {
                    fields.push(field);
                }
            }
        }

        let mut object = Map::new();
        for field in fields {
            let values: Vec<&Value> = members.iter().filter_map(|m| m.get(field)).collect();
            object.insert(field.to_string(), merge_values(&values));
        }

        if let Some(score) = object.get("score").and_then(as_number) {
            object.insert(
                "status".to_string(),
                json!(DimensionStatus::from_score(score).as_str()),
            );
        }

        let scores: Vec<f64> = members
            .iter()
            .filter_map(|m| m.get("score").and_then(as_number))
            .collect();
        if let Some(d) = disagreement(&key, &scores, variance_threshold) {
            disagreements.push(d);
        }

        merged.push(Value::Object(object));
    }

    (Value::Array(merged), disagreements)
}

fn merge_values(values: &[&Value]) -> Value {
    let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return Value::Null;
    }

    // Numeric strings ("85") average like numbers and come out as numbers
    let numbers: Vec<f64> = present.iter().filter_map(|v| as_number(v)).collect();
    if numbers.len() == present.len() {
        let avg = mean(&numbers);
        return if present.iter().all(|v| is_integral(v)) {
            json!(avg.round() as i64)
        } else {
            json!((avg * 100.0).round() / 100.0)
        };
    }

    vote(&present)
}

fn is_integral(value: &Value) -> bool {
    value.is_i64()
        || value.is_u64()
        || value.as_str().is_some_and(|s| s.trim().parse::<i64>().is_ok())
}

/// Most frequent value by serialized form; first seen wins ties
fn vote(values: &[&Value]) -> Value {
    let mut tally: Vec<(String, &Value, usize)> = Vec::new();
    for value in values {
        let serialized = value.to_string();
        match tally.iter_mut().find(|(s, _, _)| *s == serialized) {
            Some((_, _, count)) => *count += 1,
            None => tally.push((serialized, value, 1)),
        }
    }

    let mut best: Option<(&Value, usize)> = None;
    for (_, value, count) in tally {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.clone()).unwrap_or(Value::Null)
}

fn disagreement(field: &str, values: &[f64], threshold: f64) -> Option<Disagreement> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values);
    let max_deviation = values.iter().map(|v| (v - mean).abs()).fold(0.0, f64::max);
    (max_deviation > threshold).then(|| Disagreement {
        field: field.to_string(),
        values: values.to_vec(),
        mean,
        max_deviation,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::TimeoutConfig;
    use crate::ai::provider::mock::MockProvider;
    use crate::pipeline::pool::TaskPool;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn prompt(temperature: f32) -> PromptContext {
        PromptContext {
            operation: "scoring".into(),
            system_prompt: "sys".into(),
            user_prompt: "user".into(),
            temperature,
            max_tokens: 256,
            timeout: Duration::from_secs(5),
        }
    }

    fn consistency(provider: Arc<MockProvider>, permits: usize) -> SelfConsistency {
        let runner = TaskRunner::new(provider, TaskPool::new(permits), TimeoutConfig::default());
        SelfConsistency::new(runner)
    }

    #[test]
    fn test_dimension_status_thresholds() {
        assert_eq!(DimensionStatus::from_score(80.0), DimensionStatus::Excellent);
        assert_eq!(DimensionStatus::from_score(79.9), DimensionStatus::Good);
        assert_eq!(DimensionStatus::from_score(60.0), DimensionStatus::Good);
        assert_eq!(DimensionStatus::from_score(40.0), DimensionStatus::NeedsImprovement);
        assert_eq!(DimensionStatus::from_score(39.0), DimensionStatus::Critical);
    }

    #[test]
    fn test_aggregate_dimensions_and_disagreement() {
        let samples = vec![
            json!({"overall_score": 80, "summary": "good", "dimensions": [
                {"dimension": "clarity", "score": 90, "status": "excellent"},
                {"dimension": "engagement", "score": 40, "status": "needs_improvement"}
            ]}),
            json!({"overall_score": 84, "summary": "good", "dimensions": [
                {"dimension": "clarity", "score": 50, "status": "needs_improvement"},
                {"dimension": "engagement", "score": 44, "status": "needs_improvement"}
            ]}),
            json!({"overall_score": 82, "summary": "fine", "dimensions": [
                {"dimension": "clarity", "score": 100, "status": "excellent"},
                {"dimension": "engagement", "score": 42, "status": "needs_improvement"}
            ]}),
        ];

        let result = aggregate(&samples, 15.0);
        assert_eq!(result.consensus["overall_score"], 82);
        assert_eq!(result.consensus["summary"], "good");

        let dims = result.consensus["dimensions"].as_array().unwrap();
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[0]["dimension"], "clarity");
        assert_eq!(dims[0]["score"], 80);
        // re-derived, not voted
        assert_eq!(dims[0]["status"], "excellent");
        assert_eq!(dims[1]["score"], 42);
        assert_eq!(dims[1]["status"], "needs_improvement");

        // clarity: mean 80, max deviation 30
        assert_eq!(result.disagreements.len(), 1);
        assert_eq!(result.disagreements[0].field, "clarity");
        assert_eq!(result.disagreements[0].max_deviation, 30.0);

        // stddev of 80/84/82 is about 1.63
        assert!(result.confidence > 0.95 && result.confidence < 1.0);
    }

    #[test]
    fn test_overall_disagreement_and_low_confidence() {
        let samples = vec![json!({"overall_score": 20}), json!({"overall_score": 100})];
        let result = aggregate(&samples, 15.0);
        assert_eq!(result.consensus["overall_score"], 60);
        assert_eq!(result.disagreements[0].field, OVERALL_FIELD);
        // stddev 40 drives confidence to zero
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_mixed_numbers_keep_two_decimals() {
        let samples = vec![json!({"ratio": 0.5}), json!({"ratio": 0.25})];
        assert_eq!(aggregate(&samples, 15.0).consensus["ratio"], 0.38);
    }

    #[test]
    fn test_numeric_strings_are_averaged() {
        let samples = vec![
            json!({"overall_score": "70", "ratio": "0,5"}),
            json!({"overall_score": "90", "ratio": 0.25}),
        ];
        let result = aggregate(&samples, 15.0);

        assert_eq!(result.consensus["overall_score"], 80);
        assert_eq!(result.consensus["ratio"], 0.38);
        assert_eq!(score_value(&result.consensus), Some(80.0));
        assert_eq!(result.confidence, 0.75);
    }

    #[test]
    fn test_vote_ties_go_to_first_seen() {
        let samples = vec![
            json!({"climate": "neutral", "flag": true, "tags": ["a"]}),
            json!({"climate": "positive", "flag": false, "tags": ["b"]}),
        ];
        let result = aggregate(&samples, 15.0);
        assert_eq!(result.consensus["climate"], "neutral");
        assert_eq!(result.consensus["flag"], true);
        assert_eq!(result.consensus["tags"], json!(["a"]));
    }

    #[test]
    fn test_confidence_without_scores() {
        let same = vec![json!({"a": "x"}), json!({"a": "x"})];
        assert_eq!(aggregate(&same, 15.0).confidence, 1.0);
        let differ = vec![json!({"a": "x"}), json!({"a": "y"})];
        assert_eq!(aggregate(&differ, 15.0).confidence, 0.5);
    }

    #[test]
    fn test_dimension_mean_stands_in_for_overall() {
        let sample = json!({"dimensions": [
            {"key": "a", "score": 70},
            {"key": "b", "score": 90}
        ]});
        assert_eq!(overall_score(&sample), Some(80.0));
    }

    #[tokio::test]
    async fn test_single_sample_is_insufficient() {
        let provider = Arc::new(MockProvider::fixed(r#"{"overall_score": 70}"#));
        let err = consistency(provider, 4)
            .run_samples(&prompt(0.3), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuditError::InsufficientSamples { successful: 1, requested: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_identical_samples_full_confidence() {
        let provider = Arc::new(MockProvider::fixed(r#"{"overall_score": 70, "summary": "ok"}"#));
        let result = consistency(provider, 4)
            .run_samples(&prompt(0.3), 2)
            .await
            .unwrap();
        assert_eq!(result.confidence, 1.0);
        assert!(result.disagreements.is_empty());
        assert_eq!(result.consensus, json!({"overall_score": 70, "summary": "ok"}));
        assert_eq!(result.successful_samples, 2);
        assert_eq!(result.usage.total(), 30);
    }

    #[tokio::test]
    async fn test_parse_failures_are_not_successes() {
        let provider = Arc::new(MockProvider::sequence(vec![
            r#"{"overall_score": 70}"#,
            "desculpe, não consigo",
            "desculpe, não consigo",
        ]));
        let err = consistency(provider, 1)
            .run_samples(&prompt(0.3), 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuditError::InsufficientSamples { successful: 1, requested: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_failed_calls_tolerated_above_minimum() {
        let provider = Arc::new(MockProvider::new(|_, call| {
            if call == 0 {
                Err(AuditError::LlmApi("boom".into()))
            } else {
                Ok(r#"{"overall_score": 60}"#.to_string())
            }
        }));
        let result = consistency(provider, 1)
            .run_samples(&prompt(0.3), 3)
            .await
            .unwrap();
        assert_eq!(result.successful_samples, 2);
        assert_eq!(result.requested_samples, 3);
    }

    #[tokio::test]
    async fn test_samples_raise_temperature_and_share_the_bound() {
        let provider = Arc::new(
            MockProvider::fixed(r#"{"overall_score": 75}"#).with_delay(Duration::from_millis(20)),
        );
        let result = consistency(Arc::clone(&provider), 2)
            .run_samples(&prompt(0.3), 9)
            .await
            .unwrap();

        // clamped to five
        assert_eq!(result.requested_samples, MAX_SAMPLES);
        assert_eq!(provider.calls(), MAX_SAMPLES);
        assert!(provider.max_in_flight() <= 2);
        for t in provider.temperatures() {
            assert!((0.5..=0.8).contains(&t), "temperature {t}");
        }
    }

    #[test]
    fn test_temperature_capped() {
        assert!(sample_temperatures(0.95, 5).iter().all(|&t| t <= 1.0));
    }

    proptest! {
        #[test]
        fn prop_confidence_in_unit_range(scores in prop::collection::vec(0u8..=100, 2..6)) {
            let samples: Vec<Value> = scores.iter().map(|s| json!({"overall_score": s})).collect();
            let result = aggregate(&samples, 15.0);
            prop_assert!((0.0..=1.0).contains(&result.confidence));
        }

        #[test]
        fn prop_average_within_sample_range(scores in prop::collection::vec(0u8..=100, 2..6)) {
            let samples: Vec<Value> = scores.iter().map(|s| json!({"overall_score": s})).collect();
            let result = aggregate(&samples, 15.0);
            let merged = result.consensus["overall_score"].as_i64().unwrap();
            let lo = *scores.iter().min().unwrap() as i64;
            let hi = *scores.iter().max().unwrap() as i64;
            prop_assert!(merged >= lo && merged <= hi);
        }
    }
}
