//! Phase-Gated Analysis Pipeline
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Reading (structure | classification | participation)      barrier
//!     ↓
//! Analysis (pedagogy | socioemotional | legal)               barrier
//!     ↓
//! Scoring (generative, optionally self-consistent) + rule-based reports → rigor
//!     ↓
//! Enrichment (examples | coaching_email | legal_detail |
//!             socioemotional_detail | curriculum)            best-effort
//! ```
//!
//! ## Guarantees
//!
//! - A phase starts only after every sub-task of the previous one succeeded
//! - A failed sub-task fails the run with the phase and sub-task named
//! - Enrichment failures never fail the run
//! - At most `max_concurrency` collaborator calls are in flight

pub mod consistency;
pub mod context;
pub mod enrichment;
pub mod phase;
pub mod pool;
pub mod result;
pub mod tasks;

pub use consistency::{
    Aggregate, ConsensusResult, DimensionStatus, Disagreement, PromptContext, SelfConsistency,
    aggregate,
};
pub use context::{AnalysisOutputs, LessonInput, LessonMetadata, PipelineContext, ReadingOutputs};
pub use enrichment::Enrichment;
pub use phase::{PhaseKind, PhaseRecord, TaskStatus};
pub use pool::TaskPool;
pub use result::{AnalysisReport, PhaseOutputs, RunMetadata, SelfConsistencyInfo};
pub use tasks::{SubTask, TaskRunner};

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::ai::{CurriculumMatcher, MetricsCollector, SharedMetrics, SharedProvider, TimeoutConfig};
use crate::analysis::{DeterministicReports, RigorValidator};
use crate::config::Config;
use crate::types::{AuditError, Result, RunId};
use tasks::{ANALYSIS_TASKS, READING_TASKS, SCORING_TASK};

/// Orchestrator settings, usually derived from [`Config`]
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_concurrency: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub self_consistency_enabled: bool,
    pub self_consistency_samples: usize,
    pub variance_threshold: f64,
    pub discrepancy_threshold: i32,
    pub enrichment_enabled: bool,
    pub timeouts: TimeoutConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrency: config.pipeline.max_concurrency,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            self_consistency_enabled: config.pipeline.self_consistency_enabled,
            self_consistency_samples: config.pipeline.self_consistency_samples,
            variance_threshold: config.consistency.variance_threshold,
            discrepancy_threshold: config.rigor.discrepancy_threshold,
            enrichment_enabled: config.pipeline.enrichment_enabled,
            timeouts: config.pipeline.timeouts.clone(),
        }
    }
}

/// Lesson analysis orchestrator
pub struct Pipeline {
    provider: SharedProvider,
    pool: TaskPool,
    options: PipelineOptions,
    rigor: RigorValidator,
    curriculum: Option<Arc<CurriculumMatcher>>,
}

impl Pipeline {
    pub fn new(provider: SharedProvider, config: &Config) -> Self {
        Self::with_options(provider, PipelineOptions::from(config))
    }

    pub fn with_options(provider: SharedProvider, options: PipelineOptions) -> Self {
        Self {
            provider,
            pool: TaskPool::new(options.max_concurrency),
            rigor: RigorValidator::new(options.discrepancy_threshold),
            options,
            curriculum: None,
        }
    }

    /// Enable the curriculum enrichment output
    pub fn with_curriculum(mut self, matcher: Arc<CurriculumMatcher>) -> Self {
        self.curriculum = Some(matcher);
        self
    }

    /// Run every phase over one lesson
    #[instrument(skip(self, input), fields(chars = input.transcript.chars().count()))]
    pub async fn run(&self, input: LessonInput) -> Result<AnalysisReport> {
        let run_id = RunId::generate();
        let started_at = Utc::now();
        let clock = Instant::now();
        let metrics: SharedMetrics = Arc::new(MetricsCollector::new(run_id.as_str()));
        let runner = TaskRunner::new(
            Arc::clone(&self.provider),
            self.pool.clone(),
            self.options.timeouts.clone(),
        )
        .with_generation(self.options.temperature, self.options.max_tokens)
        .with_metrics(Arc::clone(&metrics));

        let mut ctx = PipelineContext::new(input);
        let mut phases = Vec::with_capacity(PhaseKind::ALL.len());

        info!(run_id = %run_id, "Phase 1: Reading");
        let outputs =
            Self::run_phase(&runner, &ctx, PhaseKind::Reading, &READING_TASKS, &mut phases).await?;
        ctx.reading = Some(ReadingOutputs::merge(outputs));

        info!(run_id = %run_id, "Phase 2: Analysis");
        let outputs =
            Self::run_phase(&runner, &ctx, PhaseKind::Analysis, &ANALYSIS_TASKS, &mut phases)
                .await?;
        ctx.analysis = Some(AnalysisOutputs::merge(outputs));

        info!(run_id = %run_id, "Phase 3: Scoring");
        let (scoring, self_consistency, record) = self.run_scoring(&runner, &ctx).await?;
        phases.push(record);

        let reports = DeterministicReports::analyze(ctx.transcript());
        let rigor = self.rigor.validate_reports(
            &scoring,
            &reports.behavior,
            &reports.context,
            &reports.compliance,
        );
        ctx.scoring = Some(scoring.clone());
        ctx.deterministic = Some(reports.clone());

        let enrichment = if self.options.enrichment_enabled {
            info!(run_id = %run_id, "Enrichment");
            metrics.start_phase("enrichment");
            let enrichment = enrichment::enrich(&runner, &ctx, self.curriculum.as_ref()).await;
            metrics.complete_phase();
            Some(enrichment)
        } else {
            None
        };

        let summary = metrics.summary();
        info!(
            run_id = %run_id,
            rigorous = rigor.rigorous_score,
            generative = ?rigor.generative_score,
            calls = summary.api_calls,
            tokens = summary.total_tokens,
            "Run complete"
        );

        let PipelineContext {
            input,
            reading,
            analysis,
            ..
        } = ctx;

        Ok(AnalysisReport {
            outputs: PhaseOutputs {
                reading: reading.unwrap_or_default(),
                analysis: analysis.unwrap_or_default(),
                scoring,
            },
            behavior: reports.behavior,
            context: reports.context,
            compliance: reports.compliance,
            rigor,
            enrichment,
            metadata: RunMetadata {
                run_id,
                started_at,
                duration_ms: clock.elapsed().as_millis() as u64,
                usage: metrics.usage(),
                self_consistency,
                lesson: input.metadata,
                phases,
                metrics: Some(summary),
            },
        })
    }

    /// Spawn every sub-task of a barrier phase and wait for all of them
    async fn run_phase(
        runner: &TaskRunner,
        ctx: &PipelineContext,
        kind: PhaseKind,
        tasks: &'static [SubTask],
        phases: &mut Vec<PhaseRecord>,
    ) -> Result<Vec<(&'static str, Value)>> {
        let names: Vec<&str> = tasks.iter().map(|t| t.name).collect();
        let mut record = PhaseRecord::new(kind, &names);

        runner.metrics().start_phase(kind.as_str());
        let prompt = ctx.user_prompt();
        let handles = tasks
            .iter()
            .map(|task| runner.spawn(task, prompt.clone()))
            .collect();
        let result = phase::barrier(&mut record, handles).await;
        runner.metrics().complete_phase();

        phases.push(record);
        result
    }

    async fn run_scoring(
        &self,
        runner: &TaskRunner,
        ctx: &PipelineContext,
    ) -> Result<(Value, SelfConsistencyInfo, PhaseRecord)> {
        let started = Instant::now();
        let mut record = PhaseRecord::new(PhaseKind::Scoring, &[SCORING_TASK.name]);
        record.start();
        runner.metrics().start_phase(PhaseKind::Scoring.as_str());

        let request = runner.request_for(&SCORING_TASK, ctx.user_prompt());
        let scored = if self.options.self_consistency_enabled {
            let prompt = PromptContext::from_request(SCORING_TASK.name, &request);
            SelfConsistency::new(runner.clone())
                .with_variance_threshold(self.options.variance_threshold)
                .run_samples(&prompt, self.options.self_consistency_samples)
                .await
                .map(|consensus| {
                    let info = SelfConsistencyInfo::from_consensus(&consensus);
                    (consensus.consensus, info)
                })
        } else {
            runner
                .call(SCORING_TASK.name, &request)
                .await
                .map(|(value, _)| (value, SelfConsistencyInfo::disabled()))
        };

        runner.metrics().complete_phase();
        record.duration_ms = started.elapsed().as_millis() as u64;

        match scored {
            Ok((value, info)) => {
                record.set_task(SCORING_TASK.name, TaskStatus::Done, None);
                record.status = TaskStatus::Done;
                Ok((value, info, record))
            }
            Err(e) => Err(AuditError::phase_failure(
                PhaseKind::Scoring.as_str(),
                SCORING_TASK.name,
                e.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GenerationRequest;
    use crate::ai::is_parse_failed;
    use crate::ai::provider::mock::MockProvider;
    use crate::pipeline::tasks::ENRICHMENT_TASKS;
    use std::time::Duration;

    const UNSAFE_LESSON: &str =
        "Hoje vamos falar sobre bullying. Você tem essa mania de interromper. O Ivã dormiu de novo.";

    fn task_of(request: &GenerationRequest) -> &'static str {
        READING_TASKS
            .iter()
            .chain(ANALYSIS_TASKS.iter())
            .chain(std::iter::once(&SCORING_TASK))
            .chain(ENRICHMENT_TASKS.iter())
            .find(|t| t.system_prompt() == request.system_prompt)
            .map(|t| t.name)
            .unwrap_or("unknown")
    }

    fn reply(task: &str) -> String {
        match task {
            "scoring" => r#"{"overall_score": 95, "summary": "excelente"}"#.to_string(),
            other => format!(r#"{{"task": "{}"}}"#, other),
        }
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            timeouts: TimeoutConfig::uniform(Duration::from_secs(5)),
            ..Default::default()
        }
    }

    fn pipeline(provider: &Arc<MockProvider>, options: PipelineOptions) -> Pipeline {
        Pipeline::with_options(Arc::clone(provider) as SharedProvider, options)
    }

    #[tokio::test]
    async fn test_full_run() {
        let provider = Arc::new(MockProvider::new(|req, _| Ok(reply(task_of(req)))));
        let report = pipeline(&provider, options())
            .run(LessonInput::new(UNSAFE_LESSON))
            .await
            .unwrap();

        assert_eq!(report.outputs.reading.structure["task"], "structure");
        assert_eq!(report.outputs.analysis.legal["task"], "legal");
        assert_eq!(report.outputs.scoring["overall_score"], 95);

        assert_eq!(report.rigor.rigorous_score, 44);
        assert_eq!(report.generative_score(), Some(95));
        assert!(report.has_discrepancy());

        let enrichment = report.enrichment.expect("enrichment enabled");
        assert_eq!(enrichment.coaching_email.unwrap()["task"], "coaching_email");
        assert!(enrichment.curriculum.is_none());

        // 3 reading + 3 analysis + 1 scoring + 4 enrichment
        assert_eq!(provider.calls(), 11);
        assert_eq!(report.metadata.usage.total(), 11 * 15);
        assert!(!report.metadata.self_consistency.enabled);
        assert_eq!(report.metadata.phases.len(), 3);
        assert!(
            report
                .metadata
                .phases
                .iter()
                .all(|p| p.status == TaskStatus::Done)
        );
    }

    #[tokio::test]
    async fn test_barrier_failure_stops_the_run() {
        let provider = Arc::new(MockProvider::new(|req, _| match task_of(req) {
            "participation" => Err(AuditError::LlmApi("503 service unavailable".into())),
            other => Ok(reply(other)),
        }));
        let err = pipeline(&provider, options())
            .run(LessonInput::new("Bom dia."))
            .await
            .unwrap_err();

        match err {
            AuditError::PhaseFailure { phase, task, .. } => {
                assert_eq!(phase, "reading");
                assert_eq!(task, "participation");
            }
            other => panic!("unexpected error: {other}"),
        }
        // analysis never started
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let provider = Arc::new(
            MockProvider::new(|req, _| Ok(reply(task_of(req)))).with_delay(Duration::from_millis(1500)),
        );
        let err = pipeline(
            &provider,
            PipelineOptions {
                timeouts: TimeoutConfig::uniform(Duration::from_secs(1)),
                ..Default::default()
            },
        )
        .run(LessonInput::new("Bom dia."))
        .await
        .unwrap_err();

        match err {
            AuditError::PhaseFailure { phase, task, reason } => {
                assert_eq!(phase, "reading");
                assert_eq!(task, "structure");
                assert!(reason.contains("Timeout"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_output_does_not_fail_the_phase() {
        let provider = Arc::new(MockProvider::new(|req, _| match task_of(req) {
            "pedagogy" => Ok("Não consegui analisar esta aula.".to_string()),
            other => Ok(reply(other)),
        }));
        let report = pipeline(&provider, options())
            .run(LessonInput::new("Bom dia."))
            .await
            .unwrap();
        assert!(is_parse_failed(&report.outputs.analysis.pedagogy));
        assert!(!is_parse_failed(&report.outputs.analysis.legal));
    }

    #[tokio::test]
    async fn test_enrichment_failure_is_tolerated() {
        let provider = Arc::new(MockProvider::new(|req, _| match task_of(req) {
            "legal_detail" | "examples" => Err(AuditError::LlmApi("boom".into())),
            other => Ok(reply(other)),
        }));
        let report = pipeline(&provider, options())
            .run(LessonInput::new("Bom dia."))
            .await
            .unwrap();

        let enrichment = report.enrichment.unwrap();
        assert!(enrichment.legal_detail.is_none());
        assert!(enrichment.examples.is_none());
        assert!(enrichment.coaching_email.is_some());
        assert_eq!(enrichment.failed, vec!["examples", "legal_detail"]);
    }

    #[tokio::test]
    async fn test_enrichment_disabled() {
        let provider = Arc::new(MockProvider::new(|req, _| Ok(reply(task_of(req)))));
        let report = pipeline(
            &provider,
            PipelineOptions {
                enrichment_enabled: false,
                ..options()
            },
        )
        .run(LessonInput::new("Bom dia."))
        .await
        .unwrap();
        assert!(report.enrichment.is_none());
        assert_eq!(provider.calls(), 7);
    }

    #[tokio::test]
    async fn test_self_consistent_scoring() {
        let provider = Arc::new(MockProvider::new(|req, _| Ok(reply(task_of(req)))));
        let report = pipeline(
            &provider,
            PipelineOptions {
                self_consistency_enabled: true,
                self_consistency_samples: 3,
                enrichment_enabled: false,
                ..options()
            },
        )
        .run(LessonInput::new("Bom dia."))
        .await
        .unwrap();

        let info = &report.metadata.self_consistency;
        assert!(info.enabled);
        assert_eq!(info.successful_samples, 3);
        assert_eq!(info.confidence, Some(1.0));
        assert_eq!(info.samples.len(), 3);
        assert!(info.samples.iter().all(|s| s["overall_score"] == 95));
        assert_eq!(report.outputs.scoring["overall_score"], 95);

        let json = serde_json::to_value(&report).unwrap();
        let samples = &json["metadata"]["self_consistency"]["samples"];
        assert_eq!(samples.as_array().map(Vec::len), Some(3));
        assert_eq!(provider.calls(), 6 + 3);
    }

    #[tokio::test]
    async fn test_insufficient_samples_fail_scoring() {
        let provider = Arc::new(MockProvider::new(|req, _| match task_of(req) {
            "scoring" => Ok("sem resposta".to_string()),
            other => Ok(reply(other)),
        }));
        let err = pipeline(
            &provider,
            PipelineOptions {
                self_consistency_enabled: true,
                self_consistency_samples: 3,
                ..options()
            },
        )
        .run(LessonInput::new("Bom dia."))
        .await
        .unwrap_err();

        match err {
            AuditError::PhaseFailure { phase, task, reason } => {
                assert_eq!(phase, "scoring");
                assert_eq!(task, "scoring");
                assert!(reason.contains("Insufficient samples"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // enrichment never ran
        assert_eq!(provider.calls(), 6 + 3);
    }

    #[tokio::test]
    async fn test_concurrency_bound_holds_across_phases() {
        let provider = Arc::new(
            MockProvider::new(|req, _| Ok(reply(task_of(req)))).with_delay(Duration::from_millis(20)),
        );
        pipeline(
            &provider,
            PipelineOptions {
                max_concurrency: 2,
                self_consistency_enabled: true,
                self_consistency_samples: 5,
                ..options()
            },
        )
        .run(LessonInput::new("Bom dia."))
        .await
        .unwrap();
        assert!(provider.max_in_flight() <= 2);
    }
}
