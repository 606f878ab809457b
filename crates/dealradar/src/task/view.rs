use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Task, TaskKind, TaskStatus};

/// Externally visible snapshot of a task.
///
/// This is the wire shape handed to callers; it is built only through
/// [`TaskView::from_task`] so the internal `Task` can change freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub current_step: Option<String>,
    pub steps_completed: Vec<String>,
    pub progress: f64,
    pub error: Option<String>,
    pub companies_added: Vec<String>,
    /// The most recent log lines, oldest first.
    pub log: Vec<String>,
}

impl TaskView {
    /// Snapshots `task`, exposing at most `log_tail` log lines.
    pub fn from_task(task: &Task, log_tail: usize) -> Self {
        let skip = task.log.len().saturating_sub(log_tail);
        Self {
            id: task.id.clone(),
            kind: task.kind,
            status: task.status,
            created_at: task.created_at,
            started_at: task.started_at,
            completed_at: task.completed_at,
            current_step: task.current_step.clone(),
            steps_completed: task.steps_completed.clone(),
            progress: task.progress(),
            error: task.error.clone(),
            companies_added: task.companies_added.clone(),
            log: task.log[skip..].to_vec(),
        }
    }
}
