//! Sub-task descriptors and the shared call runner
//!
//! Every generative sub-task is a static [`SubTask`]: a name, a call kind
//! (which picks its timeout) and the pieces of its system prompt. The
//! [`TaskRunner`] turns a descriptor plus a user prompt into one bounded,
//! timed collaborator call whose text is parsed or replaced by the
//! parse-failed sentinel.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::ai::{
    CallKind, GenerationRequest, MetricsCollector, PromptTemplates, SharedMetrics, SharedProvider,
    TimeoutConfig, TokenUsage, parse_or_sentinel, with_timeout,
};
use crate::pipeline::pool::{NamedHandle, TaskPool};
use crate::types::Result;

/// Static description of one generative sub-task
#[derive(Debug)]
pub struct SubTask {
    pub name: &'static str,
    pub kind: CallKind,
    pub focus: &'static str,
    pub objectives: &'static [&'static str],
    pub output_shape: &'static str,
}

impl SubTask {
    pub fn system_prompt(&self) -> String {
        PromptTemplates::lesson_task(self.focus)
            .objectives(self.objectives.to_vec())
            .output_json(self.output_shape)
            .build()
    }
}

pub static READING_TASKS: [SubTask; 3] = [
    SubTask {
        name: "structure",
        kind: CallKind::Standard,
        focus: "lesson structure and pacing",
        objectives: &[
            "Split the lesson into phases (opening, development, closing)",
            "Estimate the minutes spent in each phase",
            "State whether the lesson objectives were made explicit",
        ],
        output_shape: r#"{"phases": [{"name": "", "summary": "", "approx_minutes": 0}], "objectives_stated": false, "summary": ""}"#,
    },
    SubTask {
        name: "classification",
        kind: CallKind::Classification,
        focus: "lesson classification",
        objectives: &[
            "Identify the subject, grade level and main topic",
            "List the themes discussed in class",
        ],
        output_shape: r#"{"subject": "", "grade_level": "", "topic": "", "themes": [""]}"#,
    },
    SubTask {
        name: "participation",
        kind: CallKind::Standard,
        focus: "student participation",
        objectives: &[
            "Estimate the share of teacher talk versus student talk",
            "List the students mentioned and how each took part",
        ],
        output_shape: r#"{"teacher_talk_ratio": 0.0, "students_mentioned": [""], "interaction_patterns": [""], "summary": ""}"#,
    },
];

pub static ANALYSIS_TASKS: [SubTask; 3] = [
    SubTask {
        name: "pedagogy",
        kind: CallKind::Analysis,
        focus: "pedagogical quality",
        objectives: &[
            "Score each dimension from 0 to 100: clarity, engagement, questioning, feedback, classroom_management",
            "Quote transcript evidence for each score",
            "List strengths and concrete improvements",
        ],
        output_shape: r#"{"dimensions": [{"dimension": "clarity", "score": 0, "evidence": "", "comment": ""}], "strengths": [""], "improvements": [""]}"#,
    },
    SubTask {
        name: "socioemotional",
        kind: CallKind::Standard,
        focus: "socio-emotional climate of the classroom",
        objectives: &[
            "Rate the respect shown to students from 0 to 100",
            "Quote every remark that may hurt a student",
        ],
        output_shape: r#"{"climate": "positive|neutral|negative", "respect_score": 0, "concerns": [{"quote": "", "issue": ""}]}"#,
    },
    SubTask {
        name: "legal",
        kind: CallKind::Standard,
        focus: "school anti-bullying law (Lei 13.185/2015, Lei 14.811/2024)",
        objectives: &[
            "State whether bullying was addressed and whether the approach was preventive",
            "Quote teacher conduct that may itself be a form of intimidation",
        ],
        output_shape: r#"{"mentions_bullying": false, "preventive_approach": false, "teacher_conduct_issues": [{"quote": "", "law_type": ""}], "summary": ""}"#,
    },
];

pub static SCORING_TASK: SubTask = SubTask {
    name: "scoring",
    kind: CallKind::Scoring,
    focus: "final lesson scoring",
    objectives: &[
        "Combine the reading and analysis results into dimension scores from 0 to 100",
        "Give an overall_score from 0 to 100",
        "Justify each score with transcript evidence",
    ],
    output_shape: r#"{"overall_score": 0, "dimensions": [{"dimension": "", "score": 0, "status": "excellent|good|needs_improvement|critical", "justification": ""}], "summary": ""}"#,
};

pub static ENRICHMENT_TASKS: [SubTask; 4] = [
    SubTask {
        name: "examples",
        kind: CallKind::Enrichment,
        focus: "concrete teaching alternatives",
        objectives: &["For each weak moment, describe what happened and a better alternative"],
        output_shape: r#"{"examples": [{"situation": "", "better_alternative": ""}]}"#,
    },
    SubTask {
        name: "coaching_email",
        kind: CallKind::Enrichment,
        focus: "a supportive coaching email to the teacher",
        objectives: &[
            "Open with genuine strengths",
            "Name at most three priorities with practical next steps",
        ],
        output_shape: r#"{"subject": "", "body": ""}"#,
    },
    SubTask {
        name: "legal_detail",
        kind: CallKind::Enrichment,
        focus: "legal exposure under school anti-bullying law",
        objectives: &[
            "Cite the articles relevant to the observed conduct",
            "Explain the risk in plain language",
        ],
        output_shape: r#"{"articles": [{"citation": "", "relevance": ""}], "risk_explanation": ""}"#,
    },
    SubTask {
        name: "socioemotional_detail",
        kind: CallKind::Enrichment,
        focus: "socio-emotional competencies",
        objectives: &["For each competency, describe what was observed and suggest an activity"],
        output_shape: r#"{"competencies": [{"name": "", "observed": "", "suggestion": ""}]}"#,
    },
];

/// Runs collaborator calls for sub-tasks and samples
///
/// Cheap to clone; spawned tasks each own a copy.
#[derive(Clone)]
pub struct TaskRunner {
    provider: SharedProvider,
    pool: TaskPool,
    metrics: SharedMetrics,
    timeouts: TimeoutConfig,
    temperature: f32,
    max_tokens: u32,
}

impl TaskRunner {
    pub fn new(provider: SharedProvider, pool: TaskPool, timeouts: TimeoutConfig) -> Self {
        Self {
            provider,
            pool,
            metrics: Arc::new(MetricsCollector::new("detached")),
            timeouts,
            temperature: 0.3,
            max_tokens: 4096,
        }
    }

    pub fn with_generation(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn pool(&self) -> &TaskPool {
        &self.pool
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    pub fn request_for(&self, task: &SubTask, user_prompt: String) -> GenerationRequest {
        GenerationRequest::new(task.system_prompt(), user_prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_timeout(self.timeouts.for_kind(task.kind))
    }

    /// One bounded, timed call; unparseable text becomes the sentinel
    pub async fn call(
        &self,
        operation: &str,
        request: &GenerationRequest,
    ) -> Result<(Value, TokenUsage)> {
        let result = self
            .pool
            .bounded(with_timeout(
                request.timeout,
                self.provider.generate(request),
                operation,
            ))
            .await;

        match result {
            Ok(response) => {
                self.metrics.record_response(&response);
                debug!(
                    operation,
                    tokens = response.usage.total(),
                    ms = response.timing.total_ms,
                    cached = response.metadata.cached,
                    "Call complete"
                );
                Ok((parse_or_sentinel(&response.text, operation), response.usage))
            }
            Err(e) => {
                self.metrics.record_failure();
                debug!(operation, error = %e, "Call failed");
                Err(e)
            }
        }
    }

    pub async fn run(&self, task: &SubTask, user_prompt: String) -> Result<Value> {
        let request = self.request_for(task, user_prompt);
        self.call(task.name, &request).await.map(|(value, _)| value)
    }

    /// Spawn `task` as its own tokio task
    pub fn spawn(&self, task: &'static SubTask, user_prompt: String) -> NamedHandle<Value> {
        let runner = self.clone();
        self.pool
            .spawn(task.name, async move { runner.run(task, user_prompt).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::is_parse_failed;
    use crate::ai::provider::mock::MockProvider;
    use crate::types::AuditError;
    use std::time::Duration;

    fn runner(provider: MockProvider) -> TaskRunner {
        TaskRunner::new(Arc::new(provider), TaskPool::new(2), TimeoutConfig::default())
    }

    #[test]
    fn test_task_names_are_unique() {
        let mut names: Vec<&str> = READING_TASKS
            .iter()
            .chain(ANALYSIS_TASKS.iter())
            .chain(ENRICHMENT_TASKS.iter())
            .map(|t| t.name)
            .collect();
        names.push(SCORING_TASK.name);
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_system_prompt_sections() {
        let prompt = ANALYSIS_TASKS[0].system_prompt();
        assert!(prompt.contains("pedagogical quality"));
        assert!(prompt.contains("<OBJECTIVES>"));
        assert!(prompt.contains(r#""dimension": "clarity""#));
    }

    #[test]
    fn test_request_uses_kind_timeout() {
        let runner = runner(MockProvider::fixed("{}"));
        let classification = runner.request_for(&READING_TASKS[1], String::new());
        let pedagogy = runner.request_for(&ANALYSIS_TASKS[0], String::new());
        assert_eq!(classification.timeout, Duration::from_secs(60));
        assert_eq!(pedagogy.timeout, Duration::from_secs(240));
    }

    #[tokio::test]
    async fn test_prose_reply_becomes_sentinel() {
        let runner = runner(MockProvider::fixed("A aula foi ótima."));
        let value = runner.run(&SCORING_TASK, "t".into()).await.unwrap();
        assert!(is_parse_failed(&value));
        assert_eq!(runner.metrics().summary().api_calls, 1);
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let runner = runner(MockProvider::new(|_, _| Err(AuditError::LlmApi("down".into()))));
        assert!(runner.run(&SCORING_TASK, "t".into()).await.is_err());
        assert_eq!(runner.metrics().summary().failed_calls, 1);
    }
}
