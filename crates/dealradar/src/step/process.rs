//! Steps backed by an external process.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command as TokioCommand;

use crate::config::StepConfig;

use super::{Step, StepError, StepOutput};

/// Runs `program args...` in the working directory.
///
/// The child is killed if the timeout elapses.
#[derive(Debug, Clone)]
pub struct ProcessStep {
    id: String,
    description: String,
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessStep {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        program: impl Into<PathBuf>,
        args: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &StepConfig) -> Self {
        Self::new(
            config.id.clone(),
            config.description.clone(),
            config.program.clone(),
            config.args.clone(),
        )
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    async fn run(&self, workdir: &Path, timeout: Duration) -> Result<StepOutput, StepError> {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.current_dir(workdir)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => StepError::NotFound {
                step: self.id.clone(),
                program: self.program.display().to_string(),
            },
            _ => StepError::Spawn {
                step: self.id.clone(),
                reason: e.to_string(),
            },
        })?;

        // Dropping the pending future drops the child, which kills it.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(StepOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Err(e)) => Err(StepError::Spawn {
                step: self.id.clone(),
                reason: e.to_string(),
            }),
            Err(_) => Err(StepError::Timeout {
                step: self.id.clone(),
                timeout,
            }),
        }
    }
}

impl Step for ProcessStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, workdir: &Path, timeout: Duration) -> Result<StepOutput, StepError> {
        if !workdir.is_dir() {
            return Err(StepError::Spawn {
                step: self.id.clone(),
                reason: format!("working directory does not exist: {}", workdir.display()),
            });
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StepError::Spawn {
                step: self.id.clone(),
                reason: format!("failed to start runtime: {}", e),
            })?;

        runtime.block_on(self.run(workdir, timeout))
    }
}
