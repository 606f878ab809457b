use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender};
use log::{debug, error, info};

use crate::error::QueueError;
use crate::registry::RawRecord;
use crate::task::{TaskPayload, TaskView};

use super::config::QueueConfig;
use super::table::{CancelOutcome, SharedTasks};
use super::worker::run_worker;

/// Accepts company submissions and runs them through the pipeline on a single
/// background worker, one task at a time.
///
/// All methods take `&self` and may be called from any thread. Queries never
/// wait on a running step.
pub struct PipelineQueue {
    tasks: Arc<SharedTasks>,
    config: Arc<QueueConfig>,
    wake_sender: Option<Sender<()>>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PipelineQueue {
    /// Spawns the worker thread and returns a queue ready for submissions.
    pub fn start(config: QueueConfig) -> Result<Self, QueueError> {
        let tasks = Arc::new(SharedTasks::default());
        let config = Arc::new(config);
        let shutdown = Arc::new(AtomicBool::new(false));
        // One slot is enough: a pending wake-up already means "look again".
        let (wake_sender, wake_receiver) = bounded::<()>(1);

        let worker = {
            let tasks = Arc::clone(&tasks);
            let config = Arc::clone(&config);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("dealradar-worker".to_string())
                .spawn(move || run_worker(tasks, config, wake_receiver, shutdown))
                .map_err(|e| QueueError::SpawnFailed(e.to_string()))?
        };

        info!(
            "Started pipeline queue with {} steps: {}",
            config.steps.len(),
            config.step_ids().join(", ")
        );

        Ok(Self {
            tasks,
            config,
            wake_sender: Some(wake_sender),
            shutdown,
            worker: Some(worker),
        })
    }

    /// Enqueues a task and returns its id without waiting for any processing.
    pub fn submit(&self, payload: TaskPayload) -> Result<String, QueueError> {
        if self.is_shutdown() {
            return Err(QueueError::ShutDown);
        }

        let kind = payload.kind();
        let task_id = self.tasks.insert(payload, self.config.steps.len());
        debug!("Queued {} task {}", kind, task_id);

        if let Some(sender) = &self.wake_sender {
            // A full channel means the worker already has a wake-up pending.
            let _ = sender.try_send(());
        }
        Ok(task_id)
    }

    /// Enqueues semicolon-delimited company rows.
    pub fn submit_batch(&self, content: impl Into<String>) -> Result<String, QueueError> {
        self.submit(TaskPayload::Batch(content.into()))
    }

    /// Enqueues a single company record.
    pub fn submit_manual(&self, record: RawRecord) -> Result<String, QueueError> {
        self.submit(TaskPayload::Manual(record))
    }

    pub fn get(&self, task_id: &str) -> Result<TaskView, QueueError> {
        self.tasks
            .view(task_id, self.config.policy.log_tail)
            .ok_or_else(|| QueueError::NotFound(task_id.to_string()))
    }

    /// The most recently created tasks, newest first.
    pub fn list(&self) -> Vec<TaskView> {
        self.tasks
            .list(self.config.policy.list_limit, self.config.policy.log_tail)
    }

    /// Cancels a task that has not been picked up yet.
    ///
    /// Returns false when the task is unknown or the worker already claimed
    /// it. A step that is already executing is never interrupted.
    pub fn cancel(&self, task_id: &str) -> bool {
        self.cancel_detailed(task_id) == CancelOutcome::Cancelled
    }

    pub fn cancel_detailed(&self, task_id: &str) -> CancelOutcome {
        let outcome = self.tasks.cancel(task_id);
        match outcome {
            CancelOutcome::Cancelled => info!("Cancelled task {}", task_id),
            CancelOutcome::AlreadyStarted(status) => {
                debug!("Not cancelling task {}: already {}", task_id, status)
            }
            CancelOutcome::NotFound => debug!("Not cancelling unknown task {}", task_id),
        }
        outcome
    }

    /// Removes finished tasks beyond the `keep_count` most recent ones.
    pub fn evict(&self, keep_count: usize) -> usize {
        self.tasks.evict(keep_count)
    }

    /// Number of steps every task runs.
    pub fn total_steps(&self) -> usize {
        self.config.steps.len()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops accepting submissions and tells the worker to exit once its
    /// current task is done. Pending tasks stay pending.
    pub fn shutdown(&self) {
        info!("Shutting down pipeline queue...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Shuts down and blocks until the worker thread has exited.
    pub fn wait(mut self) {
        self.shutdown();
        self.join_worker();
    }

    fn join_worker(&mut self) {
        // Dropping the sender wakes a parked worker immediately.
        self.wake_sender.take();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.join() {
                error!("Queue worker panicked: {:?}", e);
            } else {
                debug!("Queue worker finished");
            }
        }
    }
}

impl Drop for PipelineQueue {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Detach rather than join: the worker may be deep inside a step.
        self.wake_sender.take();
    }
}
