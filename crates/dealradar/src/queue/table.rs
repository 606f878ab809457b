use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::task::{Task, TaskPayload, TaskStatus, TaskView};

/// Outcome of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The task exists but the worker already claimed it, or it is finished.
    AlreadyStarted(TaskStatus),
    NotFound,
}

#[derive(Default)]
struct TaskTable {
    tasks: HashMap<String, Task>,
    next_seq: u64,
}

/// The task map shared by request handlers and the worker.
///
/// Every method holds the lock only for the map access itself.
#[derive(Default)]
pub(crate) struct SharedTasks {
    inner: Mutex<TaskTable>,
}

impl SharedTasks {
    fn lock(&self) -> MutexGuard<'_, TaskTable> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Task table lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn insert(&self, payload: TaskPayload, total_steps: usize) -> String {
        let mut table = self.lock();
        let seq = table.next_seq;
        table.next_seq += 1;

        let now = Utc::now();
        let mut id = Task::make_id(payload.kind(), now);
        if table.tasks.contains_key(&id) {
            id = format!("{}_{}", id, seq);
        }

        let task = Task::with_created_at(id.clone(), payload, total_steps, seq, now);
        table.tasks.insert(id.clone(), task);
        id
    }

    pub fn view(&self, task_id: &str, log_tail: usize) -> Option<TaskView> {
        self.lock()
            .tasks
            .get(task_id)
            .map(|task| TaskView::from_task(task, log_tail))
    }

    /// Newest first, at most `limit` entries.
    pub fn list(&self, limit: usize, log_tail: usize) -> Vec<TaskView> {
        let table = self.lock();
        let mut tasks: Vec<&Task> = table.tasks.values().collect();
        tasks.sort_by(|a, b| b.seq.cmp(&a.seq));
        tasks
            .into_iter()
            .take(limit)
            .map(|task| TaskView::from_task(task, log_tail))
            .collect()
    }

    pub fn cancel(&self, task_id: &str) -> CancelOutcome {
        let mut table = self.lock();
        match table.tasks.get_mut(task_id) {
            Some(task) => {
                if task.cancel() {
                    CancelOutcome::Cancelled
                } else {
                    CancelOutcome::AlreadyStarted(task.status)
                }
            }
            None => CancelOutcome::NotFound,
        }
    }

    /// Moves the oldest pending task to VALIDATING and hands out its payload.
    pub fn claim_next(&self) -> Option<(String, TaskPayload)> {
        let mut table = self.lock();
        let task = table
            .tasks
            .values_mut()
            .filter(|task| task.status == TaskStatus::Pending)
            .min_by_key(|task| task.seq)?;

        task.begin_validation();
        Some((task.id.clone(), task.payload.clone()))
    }

    /// Applies `f` to the task. Returns false if the task no longer exists.
    pub fn update<F: FnOnce(&mut Task)>(&self, task_id: &str, f: F) -> bool {
        match self.lock().tasks.get_mut(task_id) {
            Some(task) => {
                f(task);
                true
            }
            None => false,
        }
    }

    /// Drops finished tasks that are not among the `keep_count` most recently
    /// created. Pending and in-flight tasks are never dropped.
    pub fn evict(&self, keep_count: usize) -> usize {
        let mut table = self.lock();
        let mut by_age: Vec<(u64, String, bool)> = table
            .tasks
            .values()
            .map(|task| (task.seq, task.id.clone(), task.is_terminal()))
            .collect();
        by_age.sort_by(|a, b| b.0.cmp(&a.0));

        let doomed: Vec<String> = by_age
            .into_iter()
            .skip(keep_count)
            .filter(|(_, _, terminal)| *terminal)
            .map(|(_, id, _)| id)
            .collect();

        for id in &doomed {
            table.tasks.remove(id);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }
}
