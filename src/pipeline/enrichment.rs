//! Best-effort enrichment
//!
//! Runs after scoring. Every output is independent: a failure is logged and
//! leaves its field `None`, it never fails the run.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ai::{CallKind, CurriculumMatcher, VectorMatch, with_timeout};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::pool::{NamedHandle, join_all};
use crate::pipeline::tasks::{ENRICHMENT_TASKS, TaskRunner};
use crate::types::AuditError;

pub const CURRICULUM_TASK: &str = "curriculum";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Enrichment {
    pub examples: Option<Value>,
    pub coaching_email: Option<Value>,
    pub legal_detail: Option<Value>,
    pub socioemotional_detail: Option<Value>,
    pub curriculum: Option<Vec<VectorMatch>>,
    /// Outputs that failed, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

impl Enrichment {
    fn set(&mut self, name: &str, value: Value) {
        let slot = match name {
            "examples" => &mut self.examples,
            "coaching_email" => &mut self.coaching_email,
            "legal_detail" => &mut self.legal_detail,
            "socioemotional_detail" => &mut self.socioemotional_detail,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// Fan out every enrichment output and collect what succeeded
pub async fn enrich(
    runner: &TaskRunner,
    ctx: &PipelineContext,
    curriculum: Option<&Arc<CurriculumMatcher>>,
) -> Enrichment {
    let prompt = ctx.user_prompt();
    let handles: Vec<NamedHandle<Value>> = ENRICHMENT_TASKS
        .iter()
        .map(|task| runner.spawn(task, prompt.clone()))
        .collect();

    let curriculum_handle = curriculum.map(|matcher| {
        let matcher = Arc::clone(matcher);
        let pool = runner.pool().clone();
        let timeout = runner.timeouts().for_kind(CallKind::Enrichment);
        let text = ctx.transcript().to_string();
        runner.pool().spawn(CURRICULUM_TASK, async move {
            pool.bounded(with_timeout(
                timeout,
                matcher.match_default(&text),
                CURRICULUM_TASK,
            ))
            .await
        })
    });

    let mut enrichment = Enrichment::default();
    for (name, result) in join_all(handles).await {
        match result {
            Ok(value) => enrichment.set(name, value),
            Err(e) => record_failure(&mut enrichment, name, e),
        }
    }

    if let Some(handle) = curriculum_handle {
        let (name, result) = handle.join().await;
        match result {
            Ok(matches) => enrichment.curriculum = Some(matches),
            Err(e) => record_failure(&mut enrichment, name, e),
        }
    }

    info!(failed = enrichment.failed.len(), "Enrichment complete");
    enrichment
}

fn record_failure(enrichment: &mut Enrichment, name: &str, cause: AuditError) {
    let err = AuditError::Enrichment {
        task: name.to_string(),
        reason: cause.to_string(),
    };
    warn!(error = %err, "Enrichment output skipped");
    enrichment.failed.push(name.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::mock::MockProvider;
    use crate::ai::embedding::testing::LetterEmbedder;
    use crate::ai::{Competency, InMemoryVectorStore, TimeoutConfig};
    use crate::pipeline::context::LessonInput;
    use crate::pipeline::pool::TaskPool;

    fn runner(provider: MockProvider) -> TaskRunner {
        TaskRunner::new(Arc::new(provider), TaskPool::new(2), TimeoutConfig::default())
    }

    #[tokio::test]
    async fn test_failures_leave_fields_empty() {
        let provider = MockProvider::new(|req, _| {
            if req.system_prompt.contains("coaching email") {
                Err(AuditError::LlmApi("rate limited".into()))
            } else {
                Ok(r#"{"ok": true}"#.to_string())
            }
        });
        let ctx = PipelineContext::new(LessonInput::new("Bom dia."));
        let enrichment = enrich(&runner(provider), &ctx, None).await;

        assert!(enrichment.examples.is_some());
        assert!(enrichment.coaching_email.is_none());
        assert!(enrichment.legal_detail.is_some());
        assert!(enrichment.socioemotional_detail.is_some());
        assert!(enrichment.curriculum.is_none());
        assert_eq!(enrichment.failed, vec!["coaching_email"]);
    }

    #[tokio::test]
    async fn test_curriculum_only_with_matcher() {
        let matcher = Arc::new(CurriculumMatcher::new(
            Arc::new(LetterEmbedder),
            Arc::new(InMemoryVectorStore::new()),
        ));
        matcher
            .load(&[Competency {
                id: "EF09LP01".into(),
                description: "bbbb".into(),
                area: None,
            }])
            .await
            .unwrap();

        let ctx = PipelineContext::new(LessonInput::new("bbb"));
        let enrichment = enrich(&runner(MockProvider::fixed("{}")), &ctx, Some(&matcher)).await;
        let curriculum = enrichment.curriculum.expect("curriculum expected");
        assert_eq!(curriculum[0].id, "EF09LP01");
        assert!(enrichment.failed.is_empty());
    }
}
