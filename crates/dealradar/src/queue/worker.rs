use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};
use thiserror::Error;
use tracing::info_span;

use crate::error::{RegistryError, ValidationError};
use crate::registry::{parse_batch, CompanyRecord, CompanyRegistry};
use crate::step::{StepError, StepRunner};
use crate::task::TaskPayload;

use super::config::QueueConfig;
use super::table::SharedTasks;

/// Why a claimed task ended up FAILED. Displays as the bare cause.
#[derive(Debug, Error)]
enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error("Task was removed while running")]
    Vanished,
}

/// Worker loop. Drains pending tasks one at a time, oldest first, and parks
/// on `wake` when there is nothing to do.
pub(crate) fn run_worker(
    tasks: Arc<SharedTasks>,
    config: Arc<QueueConfig>,
    wake: Receiver<()>,
    shutdown: Arc<AtomicBool>,
) {
    debug!("Queue worker started");

    let registry = CompanyRegistry::new(&config.registry_path);
    let runner = StepRunner::new(config.step_timeout, &config.policy);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Queue worker received shutdown signal");
            break;
        }

        if let Some((task_id, payload)) = tasks.claim_next() {
            execute_task(&tasks, &config, &registry, &runner, &task_id, payload);
            if let Some(keep) = config.keep_tasks {
                let evicted = tasks.evict(keep);
                if evicted > 0 {
                    debug!("Evicted {} finished tasks", evicted);
                }
            }
            continue;
        }

        match wake.recv_timeout(config.poll_interval) {
            Ok(()) | Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Queue worker wake channel disconnected");
                break;
            }
        }
    }

    debug!("Queue worker stopped");
}

fn execute_task(
    tasks: &SharedTasks,
    config: &QueueConfig,
    registry: &CompanyRegistry,
    runner: &StepRunner,
    task_id: &str,
    payload: TaskPayload,
) {
    let _span = info_span!("task", task_id = %task_id, kind = %payload.kind()).entered();
    info!("Processing task {}", task_id);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        run_task(tasks, config, registry, runner, task_id, &payload)
    }));

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(panic) => Some(panic_message(panic.as_ref())),
    };

    match failure {
        None => {
            // The last finished step already completed the task; this only
            // matters for a pipeline with no steps.
            tasks.update(task_id, |task| task.complete());
            info!("Task {} completed", task_id);
        }
        Some(message) => {
            error!("Task {} failed: {}", task_id, message);
            tasks.update(task_id, |task| task.fail(message));
        }
    }
}

fn run_task(
    tasks: &SharedTasks,
    config: &QueueConfig,
    registry: &CompanyRegistry,
    runner: &StepRunner,
    task_id: &str,
    payload: &TaskPayload,
) -> Result<(), TaskError> {
    let companies = parse_payload(payload)?;
    update(tasks, task_id, |task| {
        task.log(format!("Parsed {} companies", companies.len()))
    })?;

    let added = registry.merge(&companies)?;
    let registry_name = registry
        .path()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "registry".to_string());
    update(tasks, task_id, |task| {
        task.companies_added = added.clone();
        task.log(format!("Added to {}: {}", registry_name, added.join(", ")));
        task.begin_running();
    })?;

    for step in &config.steps {
        update(tasks, task_id, |task| {
            task.start_step(step.id(), step.description())
        })?;

        let tail = runner.run(step.as_ref(), &config.working_directory)?;

        update(tasks, task_id, |task| task.finish_step(step.id(), &tail))?;
    }

    Ok(())
}

fn parse_payload(payload: &TaskPayload) -> Result<Vec<CompanyRecord>, ValidationError> {
    match payload {
        TaskPayload::Batch(content) => parse_batch(content),
        TaskPayload::Manual(raw) => Ok(vec![CompanyRecord::from_raw(raw)?]),
    }
}

fn update<F: FnOnce(&mut crate::task::Task)>(
    tasks: &SharedTasks,
    task_id: &str,
    f: F,
) -> Result<(), TaskError> {
    if tasks.update(task_id, f) {
        Ok(())
    } else {
        warn!("Task {} disappeared from the table", task_id);
        Err(TaskError::Vanished)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Internal error: {}", detail)
}
