//! Shared harness for queue integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use dealradar::{
    PipelineQueue, QueueConfig, Step, StepError, StepOutput, TaskStatus, TaskView,
};

/// What a [`FakeStep`] does when executed.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed(String),
    Fail { code: i32, stderr: String },
    /// Sleeps, then succeeds. Honors the runner's timeout like a real process.
    Sleep(Duration),
}

/// An in-process step that records how often it ran.
pub struct FakeStep {
    id: String,
    behavior: Behavior,
    runs: AtomicUsize,
}

impl FakeStep {
    pub fn new(id: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            behavior,
            runs: AtomicUsize::new(0),
        })
    }

    pub fn ok(id: &str) -> Arc<Self> {
        Self::new(id, Behavior::Succeed(format!("{} done", id)))
    }

    pub fn failing(id: &str, stderr: &str) -> Arc<Self> {
        Self::new(
            id,
            Behavior::Fail {
                code: 1,
                stderr: stderr.to_string(),
            },
        )
    }

    pub fn sleeping(id: &str, duration: Duration) -> Arc<Self> {
        Self::new(id, Behavior::Sleep(duration))
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Step for FakeStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        ""
    }

    fn execute(&self, _workdir: &Path, timeout: Duration) -> Result<StepOutput, StepError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(stdout) => Ok(StepOutput::success(stdout.clone())),
            Behavior::Fail { code, stderr } => Ok(StepOutput::failure(*code, stderr.clone())),
            Behavior::Sleep(duration) => {
                if *duration > timeout {
                    thread::sleep(timeout);
                    return Err(StepError::Timeout {
                        step: self.id.clone(),
                        timeout,
                    });
                }
                thread::sleep(*duration);
                Ok(StepOutput::success(format!("{} done", self.id)))
            }
        }
    }
}

/// A queue over a temporary registry, with a fast poll interval.
pub struct Harness {
    pub queue: PipelineQueue,
    pub temp: TempDir,
}

impl Harness {
    pub fn new(steps: Vec<Arc<dyn Step>>) -> Self {
        Self::with_config(steps, |config| config)
    }

    pub fn with_config<F>(steps: Vec<Arc<dyn Step>>, customize: F) -> Self
    where
        F: FnOnce(QueueConfig) -> QueueConfig,
    {
        let temp = TempDir::new().unwrap();
        let config = QueueConfig::new(temp.path().join("companies.csv"), temp.path(), steps)
            .with_poll_interval(Duration::from_millis(20))
            .with_keep_tasks(None);
        let queue = PipelineQueue::start(customize(config)).unwrap();
        Self { queue, temp }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.temp.path().join("companies.csv")
    }

    pub fn registry_contents(&self) -> Option<String> {
        std::fs::read_to_string(self.registry_path()).ok()
    }

    pub fn write_registry(&self, contents: &str) {
        std::fs::write(self.registry_path(), contents).unwrap();
    }

    pub fn wait_for_terminal(&self, task_id: &str) -> TaskView {
        self.wait_for(task_id, |view| view.status.is_terminal())
    }

    pub fn wait_for_status(&self, task_id: &str, status: TaskStatus) -> TaskView {
        self.wait_for(task_id, |view| view.status == status)
    }

    /// Polls until `done` holds, panicking after ten seconds.
    pub fn wait_for<F>(&self, task_id: &str, done: F) -> TaskView
    where
        F: Fn(&TaskView) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let view = self.queue.get(task_id).unwrap();
            if done(&view) {
                return view;
            }
            if Instant::now() > deadline {
                panic!("timed out waiting on task {}: {:?}", task_id, view);
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

pub fn steps(fakes: &[Arc<FakeStep>]) -> Vec<Arc<dyn Step>> {
    fakes
        .iter()
        .map(|fake| Arc::clone(fake) as Arc<dyn Step>)
        .collect()
}

pub fn acme_record() -> dealradar::RawRecord {
    serde_json::json!({
        "company_id": "acme",
        "company_name": "Acme Corp",
        "country": "US",
        "website": "https://acme.com"
    })
    .as_object()
    .unwrap()
    .clone()
}
