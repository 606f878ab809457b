//! Pipeline steps: opaque external programs driven one after another.

pub mod catalog;
pub mod process;
pub mod runner;

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

pub use catalog::{default_step_configs, CatalogEntry, PIPELINE_STEPS};
pub use process::ProcessStep;
pub use runner::StepRunner;

/// Raw outcome of a step that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl StepOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human-readable exit status.
    pub fn status_label(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("{step} failed ({status}): {excerpt}")]
    Execution {
        step: String,
        status: String,
        excerpt: String,
    },

    #[error("{step} timed out after {timeout:?}")]
    Timeout { step: String, timeout: Duration },

    #[error("{step}: program not found: {program}")]
    NotFound { step: String, program: String },

    #[error("Failed to run {step}: {reason}")]
    Spawn { step: String, reason: String },
}

impl StepError {
    /// Id of the step that failed.
    pub fn step(&self) -> &str {
        match self {
            StepError::Execution { step, .. }
            | StepError::Timeout { step, .. }
            | StepError::NotFound { step, .. }
            | StepError::Spawn { step, .. } => step,
        }
    }
}

/// One stage of the ingestion pipeline.
///
/// Implementations run to completion or until `timeout` elapses. A non-zero
/// exit is *not* an error at this level; [`StepRunner`] interprets it.
pub trait Step: Send + Sync {
    /// Stable identifier recorded in `steps_completed`.
    fn id(&self) -> &str;

    /// Log line written when the step starts.
    fn description(&self) -> &str;

    fn execute(&self, workdir: &Path, timeout: Duration) -> Result<StepOutput, StepError>;
}
