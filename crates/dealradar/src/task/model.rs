use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::RawRecord;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Validating,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Completed, failed and cancelled tasks never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Validating => "validating",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the submitted company data arrived.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskKind {
    #[serde(rename = "add_company_csv")]
    BatchFile,
    #[serde(rename = "add_company_manual")]
    SingleRecord,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::BatchFile => "add_company_csv",
            TaskKind::SingleRecord => "add_company_manual",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Company data awaiting validation. The variant decides the parsing strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    /// Semicolon-delimited text, optionally with a header row.
    Batch(String),
    /// One record as submitted; required fields are checked by the worker.
    Manual(RawRecord),
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::Batch(_) => TaskKind::BatchFile,
            TaskPayload::Manual(_) => TaskKind::SingleRecord,
        }
    }
}

/// One request to onboard companies and drive them through the pipeline.
///
/// Transition methods are no-ops once the task is terminal.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    pub payload: TaskPayload,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub current_step: Option<String>,
    pub steps_completed: Vec<String>,
    pub error: Option<String>,
    pub companies_added: Vec<String>,
    pub log: Vec<String>,
    /// Creation order within the owning queue.
    pub(crate) seq: u64,
    total_steps: usize,
}

impl Task {
    pub fn new(id: String, payload: TaskPayload, total_steps: usize, seq: u64) -> Self {
        Self::with_created_at(id, payload, total_steps, seq, Utc::now())
    }

    pub(crate) fn with_created_at(
        id: String,
        payload: TaskPayload,
        total_steps: usize,
        seq: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: payload.kind(),
            payload,
            status: TaskStatus::Pending,
            created_at,
            started_at: None,
            completed_at: None,
            current_step: None,
            steps_completed: Vec::new(),
            error: None,
            companies_added: Vec::new(),
            log: Vec::new(),
            seq,
            total_steps,
        }
    }

    /// Builds an id from the task kind and a microsecond timestamp.
    pub fn make_id(kind: TaskKind, at: DateTime<Utc>) -> String {
        format!("{}_{}", kind.as_str(), at.timestamp_micros())
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fraction of pipeline steps finished, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return if self.status == TaskStatus::Completed {
                1.0
            } else {
                0.0
            };
        }
        self.steps_completed.len() as f64 / self.total_steps as f64
    }

    /// Appends a `[HH:MM:SS]`-stamped line.
    pub fn log(&mut self, message: impl AsRef<str>) {
        if self.is_terminal() {
            return;
        }
        self.push_log(message.as_ref());
    }

    fn push_log(&mut self, message: &str) {
        let stamp = Utc::now().format("%H:%M:%S");
        self.log.push(format!("[{}] {}", stamp, message));
    }

    /// PENDING → VALIDATING. Returns false if the task was not pending.
    pub fn begin_validation(&mut self) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        self.status = TaskStatus::Validating;
        self.started_at = Some(Utc::now());
        self.push_log("Starting task...");
        true
    }

    /// VALIDATING → RUNNING.
    pub fn begin_running(&mut self) -> bool {
        if self.status != TaskStatus::Validating {
            return false;
        }
        self.status = TaskStatus::Running;
        true
    }

    pub fn start_step(&mut self, step_id: &str, description: &str) {
        if self.status != TaskStatus::Running {
            return;
        }
        self.current_step = Some(step_id.to_string());
        if description.is_empty() {
            self.push_log(&format!("Running {}...", step_id));
        } else {
            self.push_log(description);
        }
    }

    /// Records a finished step. Finishing the last step completes the task
    /// in the same update, so progress reaches 1.0 only when completed.
    pub fn finish_step(&mut self, step_id: &str, output_tail: &[String]) {
        if self.status != TaskStatus::Running {
            return;
        }
        for line in output_tail {
            self.push_log(&format!("  → {}", line));
        }
        self.steps_completed.push(step_id.to_string());
        if self.steps_completed.len() >= self.total_steps {
            self.complete();
        }
    }

    pub fn complete(&mut self) {
        if self.status != TaskStatus::Running {
            return;
        }
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.push_log("✅ Task completed successfully!");
    }

    /// VALIDATING or RUNNING → FAILED. `current_step` is kept so callers can
    /// see where the pipeline stopped.
    pub fn fail(&mut self, error: impl Into<String>) {
        if !matches!(self.status, TaskStatus::Validating | TaskStatus::Running) {
            return;
        }
        let error = error.into();
        self.push_log(&format!("❌ Error: {}", error));
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }

    /// PENDING → CANCELLED. Returns false for tasks the worker already claimed.
    pub fn cancel(&mut self) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        self.status = TaskStatus::Cancelled;
        self.push_log("Task cancelled");
        true
    }
}
