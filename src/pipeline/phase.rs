//! Pipeline phases and the all-or-nothing barrier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};

use crate::pipeline::pool::{NamedHandle, join_all};
use crate::types::{AuditError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Reading,
    Analysis,
    Scoring,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 3] = [PhaseKind::Reading, PhaseKind::Analysis, PhaseKind::Scoring];

    pub const fn as_str(self) -> &'static str {
        match self {
            PhaseKind::Reading => "reading",
            PhaseKind::Analysis => "analysis",
            PhaseKind::Scoring => "scoring",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub name: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Lifecycle of one phase: pending -> running -> done | failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub kind: PhaseKind,
    pub status: TaskStatus,
    pub tasks: Vec<TaskRecord>,
    pub duration_ms: u64,
}

impl PhaseRecord {
    pub fn new(kind: PhaseKind, task_names: &[&str]) -> Self {
        Self {
            kind,
            status: TaskStatus::Pending,
            tasks: task_names
                .iter()
                .map(|name| TaskRecord {
                    name: name.to_string(),
                    status: TaskStatus::Pending,
                    error: None,
                })
                .collect(),
            duration_ms: 0,
        }
    }

    pub fn start(&mut self) {
        self.status = TaskStatus::Running;
        for task in &mut self.tasks {
            task.status = TaskStatus::Running;
        }
    }

    pub fn set_task(&mut self, name: &str, status: TaskStatus, error: Option<String>) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.name == name) {
            task.status = status;
            task.error = error;
        }
    }

    /// First failed task in declaration order
    pub fn first_failure(&self) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.status == TaskStatus::Failed)
    }
}

/// Wait for every sub-task of a phase, then succeed only if all succeeded
///
/// Outputs are returned in declaration order. On failure nothing is
/// returned and the error names the first failing sub-task.
pub async fn barrier<T>(
    record: &mut PhaseRecord,
    handles: Vec<NamedHandle<T>>,
) -> Result<Vec<(&'static str, T)>> {
    let started = Instant::now();
    record.start();

    let results = join_all(handles).await;
    let mut outputs = Vec::with_capacity(results.len());

    for (name, result) in results {
        match result {
            Ok(value) => {
                record.set_task(name, TaskStatus::Done, None);
                outputs.push((name, value));
            }
            Err(e) => {
                warn!(phase = %record.kind, task = name, error = %e, "Sub-task failed");
                record.set_task(name, TaskStatus::Failed, Some(e.to_string()));
            }
        }
    }

    record.duration_ms = started.elapsed().as_millis() as u64;

    if let Some(failed) = record.first_failure() {
        let err = AuditError::phase_failure(
            record.kind.as_str(),
            failed.name.clone(),
            failed.error.clone().unwrap_or_default(),
        );
        record.status = TaskStatus::Failed;
        return Err(err);
    }

    record.status = TaskStatus::Done;
    debug!(phase = %record.kind, tasks = outputs.len(), ms = record.duration_ms, "Phase complete");
    Ok(outputs)
}
