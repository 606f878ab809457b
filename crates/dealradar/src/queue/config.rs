use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, QueuePolicy};
use crate::step::{default_step_configs, ProcessStep, Step};

/// Everything the queue worker needs, resolved from [`Config`].
pub struct QueueConfig {
    pub registry_path: PathBuf,
    /// Working directory for every step.
    pub working_directory: PathBuf,
    /// Steps in execution order.
    pub steps: Vec<Arc<dyn Step>>,
    pub step_timeout: Duration,
    /// How long the idle worker waits before rescanning for work.
    pub poll_interval: Duration,
    pub policy: QueuePolicy,
    /// Automatic retention sweep after each task; `None` disables it.
    pub keep_tasks: Option<usize>,
}

impl QueueConfig {
    /// Creates a config with default timeouts and limits.
    pub fn new(
        registry_path: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
        steps: Vec<Arc<dyn Step>>,
    ) -> Self {
        Self {
            registry_path: registry_path.into(),
            working_directory: working_directory.into(),
            steps,
            step_timeout: Duration::from_secs(3600),
            poll_interval: Duration::from_secs(1),
            policy: QueuePolicy::default(),
            keep_tasks: Some(50),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let data_dir = PathBuf::from(&config.data_directory);
        let registry_path = resolve_against(&data_dir, &config.registry_file);
        let scripts_dir = PathBuf::from(&config.scripts_directory);
        let working_directory = config
            .working_directory
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| scripts_dir.clone());

        let step_configs = if config.steps.is_empty() {
            default_step_configs(&config.interpreter, &scripts_dir)
        } else {
            config.steps.clone()
        };
        let steps = step_configs
            .iter()
            .map(|step| Arc::new(ProcessStep::from_config(step)) as Arc<dyn Step>)
            .collect();

        Self {
            registry_path,
            working_directory,
            steps,
            step_timeout: Duration::from_secs(config.step_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            policy: config.policy.clone(),
            keep_tasks: config.retention.keep_tasks,
        }
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_policy(mut self, policy: QueuePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_keep_tasks(mut self, keep_tasks: Option<usize>) -> Self {
        self.keep_tasks = keep_tasks;
        self
    }

    pub fn step_ids(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.id().to_string()).collect()
    }
}

fn resolve_against(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
