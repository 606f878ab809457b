use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info_span, warn};

use crate::config::QueuePolicy;
use crate::sanitize;

use super::{Step, StepError};

/// Runs steps with a wall-clock budget and turns their raw output into
/// either a short log tail or a bounded error.
#[derive(Debug, Clone)]
pub struct StepRunner {
    timeout: Duration,
    output_tail: usize,
    error_excerpt_chars: usize,
}

impl StepRunner {
    pub fn new(timeout: Duration, policy: &QueuePolicy) -> Self {
        Self {
            timeout,
            output_tail: policy.step_output_tail,
            error_excerpt_chars: policy.error_excerpt_chars,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Executes `step` in `workdir`.
    ///
    /// On success returns the last few non-blank stdout lines. A non-zero exit
    /// becomes [`StepError::Execution`] carrying a bounded excerpt of stderr,
    /// or of stdout when stderr is empty.
    pub fn run(&self, step: &dyn Step, workdir: &Path) -> Result<Vec<String>, StepError> {
        let _span = info_span!("step",
            step_id = %step.id(),
            workdir = %sanitize::redact_path(workdir),
        )
        .entered();

        let started = Instant::now();
        let output = step.execute(workdir, self.timeout).inspect_err(|e| {
            warn!(error = %e, "step could not complete");
        })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !output.is_success() {
            let diagnostic = if output.stderr.trim().is_empty() {
                &output.stdout
            } else {
                &output.stderr
            };
            let excerpt = sanitize::excerpt(diagnostic.trim(), self.error_excerpt_chars);
            warn!(status = %output.status_label(), elapsed_ms, "step failed");
            return Err(StepError::Execution {
                step: step.id().to_string(),
                status: output.status_label(),
                excerpt: excerpt.to_string(),
            });
        }

        debug!(elapsed_ms, "step finished");
        Ok(sanitize::tail_lines(&output.stdout, self.output_tail))
    }
}
