//! Pipeline Metrics Collection
//!
//! Centralized metrics aggregation for collaborator usage across one
//! pipeline run. Thread-safe for concurrently running sub-tasks.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = MetricsCollector::new("run-123");
//! metrics.start_phase("reading");
//! metrics.record_response(&response);
//! metrics.complete_phase();
//! let summary = metrics.summary();
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::ai::provider::{LlmResponse, TokenUsage};

// =============================================================================
// Metrics Collector
// =============================================================================

/// Thread-safe metrics collector for one pipeline run.
///
/// Counters are atomics; the phase log sits behind a RwLock and is only
/// touched at phase boundaries.
pub struct MetricsCollector {
    run_id: String,
    start_time: Instant,
    api_calls: AtomicU32,
    failed_calls: AtomicU32,
    cache_hits: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
    phases: RwLock<Vec<PhaseMetrics>>,
    current: RwLock<Option<PhaseStart>>,
}

struct PhaseStart {
    name: String,
    started: Instant,
    api_calls: u32,
    failed_calls: u32,
    input_tokens: u64,
    output_tokens: u64,
}

/// Metrics for one pipeline phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseMetrics {
    pub name: String,
    pub api_calls: u32,
    pub failed_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
}

/// Summary statistics for a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub run_id: String,
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub failed_calls: u32,
    pub cache_hits: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
    pub phases: Vec<PhaseMetrics>,
}

impl MetricsCollector {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            failed_calls: AtomicU32::new(0),
            cache_hits: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            phases: RwLock::new(Vec::new()),
            current: RwLock::new(None),
        }
    }

    /// Record a successful collaborator response
    pub fn record_response(&self, response: &LlmResponse) {
        if response.metadata.cached {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        self.record_tokens(&response.usage, response.timing.total_ms);
    }

    /// Record token usage directly
    pub fn record_tokens(&self, usage: &TokenUsage, latency_ms: u64) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(usage.input_tokens as u64, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens as u64, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Record a failed collaborator call
    pub fn record_failure(&self) {
        self.failed_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Token usage so far
    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: u32::try_from(self.input_tokens.load(Ordering::Relaxed))
                .unwrap_or(u32::MAX),
            output_tokens: u32::try_from(self.output_tokens.load(Ordering::Relaxed))
                .unwrap_or(u32::MAX),
        }
    }

    /// Start a new phase, closing any phase still open
    pub fn start_phase(&self, name: impl Into<String>) {
        self.complete_phase();
        let mut current = self.current.write().unwrap_or_else(|poisoned| {
            tracing::error!("Metrics current phase RwLock poisoned, recovering");
            poisoned.into_inner()
        });
        *current = Some(PhaseStart {
            name: name.into(),
            started: Instant::now(),
            api_calls: self.api_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
        });
    }

    /// Close the open phase and log its deltas
    pub fn complete_phase(&self) {
        let open = self
            .current
            .write()
            .unwrap_or_else(|poisoned| {
                tracing::error!("Metrics current phase RwLock poisoned, recovering");
                poisoned.into_inner()
            })
            .take();

        let Some(start) = open else {
            return;
        };

        let metrics = PhaseMetrics {
            name: start.name,
            api_calls: self.api_calls.load(Ordering::Relaxed) - start.api_calls,
            failed_calls: self.failed_calls.load(Ordering::Relaxed) - start.failed_calls,
            input_tokens: self.input_tokens.load(Ordering::Relaxed) - start.input_tokens,
            output_tokens: self.output_tokens.load(Ordering::Relaxed) - start.output_tokens,
            duration_ms: start.started.elapsed().as_millis() as u64,
        };

        self.phases
            .write()
            .unwrap_or_else(|poisoned| {
                tracing::error!("Metrics phases RwLock poisoned, recovering");
                poisoned.into_inner()
            })
            .push(metrics);
    }

    /// Current metrics snapshot
    pub fn summary(&self) -> MetricsSummary {
        let api_calls = self.api_calls.load(Ordering::Relaxed);
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency = if api_calls > 0 {
            total_latency as f64 / api_calls as f64
        } else {
            0.0
        };

        let phases = self
            .phases
            .read()
            .unwrap_or_else(|poisoned| {
                tracing::error!("Metrics phases RwLock poisoned on read, recovering");
                poisoned.into_inner()
            })
            .clone();

        MetricsSummary {
            run_id: self.run_id.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls,
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_latency_ms: avg_latency,
            phases,
        }
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "Run: {}\n\
             Duration: {:.1}s\n\
             Calls: {} ({} failed, {} cached)\n\
             Tokens: {} (input: {}, output: {})\n\
             Avg Latency: {:.0}ms",
            self.run_id,
            self.total_duration_ms as f64 / 1000.0,
            self.api_calls,
            self.failed_calls,
            self.cache_hits,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.avg_latency_ms,
        )
    }
}

/// Shared metrics collector for pipeline stages
pub type SharedMetrics = Arc<MetricsCollector>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{ResponseMetadata, ResponseTiming};

    #[test]
    fn test_record_response() {
        let metrics = MetricsCollector::new("test-run");

        let response = LlmResponse::with_metrics(
            "{}",
            TokenUsage::from_openai(100, 50),
            ResponseTiming { total_ms: 500 },
            ResponseMetadata {
                model: "gpt-4o-mini".to_string(),
                provider: "openai".to_string(),
                cached: true,
            },
        );

        metrics.record_response(&response);

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 1);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.total_tokens, 150);
        assert_eq!(metrics.usage(), TokenUsage::from_openai(100, 50));
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let metrics = Arc::new(MetricsCollector::new("concurrent-test"));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_tokens(&TokenUsage::from_openai(10, 5), 50);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 1000);
        assert_eq!(summary.input_tokens, 10000);
        assert_eq!(summary.output_tokens, 5000);
        assert!((summary.avg_latency_ms - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_phase_deltas() {
        let metrics = MetricsCollector::new("phases");
        metrics.record_tokens(&TokenUsage::from_openai(1, 1), 1);

        metrics.start_phase("reading");
        metrics.record_tokens(&TokenUsage::from_openai(10, 5), 10);
        metrics.record_failure();

        metrics.start_phase("analysis");
        metrics.record_tokens(&TokenUsage::from_openai(20, 10), 10);
        metrics.record_tokens(&TokenUsage::from_openai(20, 10), 10);
        metrics.complete_phase();

        let summary = metrics.summary();
        assert_eq!(summary.phases.len(), 2);
        assert_eq!(summary.phases[0].name, "reading");
        assert_eq!(summary.phases[0].api_calls, 1);
        assert_eq!(summary.phases[0].failed_calls, 1);
        assert_eq!(summary.phases[1].api_calls, 2);
        assert_eq!(summary.phases[1].input_tokens, 40);
    }

    #[test]
    fn test_summary_display() {
        let metrics = MetricsCollector::new("display-test");
        metrics.record_tokens(&TokenUsage::from_openai(1000, 500), 1000);

        let display = metrics.summary().display();
        assert!(display.contains("display-test"));
        assert!(display.contains("1500"));
    }
}
