//! End-to-end runs with real subprocess steps, configured from a JSON file.

#![cfg(unix)]

mod common;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use dealradar::{load_config, PipelineQueue, QueueConfig, TaskStatus};

fn write_config(dir: &Path, steps: serde_json::Value, timeout_secs: u64) -> std::path::PathBuf {
    let work = dir.join("work");
    fs::create_dir_all(&work).unwrap();
    let config = json!({
        "version": "1.0",
        "data_directory": dir.join("data").to_string_lossy(),
        "working_directory": work.to_string_lossy(),
        "steps": steps,
        "step_timeout_secs": timeout_secs,
        "poll_interval_ms": 20,
        "retention": { "keep_tasks": null }
    });
    let path = dir.join("config.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

fn sh(id: &str, script: &str) -> serde_json::Value {
    json!({ "id": id, "program": "sh", "args": ["-c", script] })
}

fn start(config_path: &Path) -> PipelineQueue {
    let config = load_config(config_path).unwrap();
    let queue_config = QueueConfig::from_config(&config).with_poll_interval(Duration::from_millis(20));
    PipelineQueue::start(queue_config).unwrap()
}

fn wait(queue: &PipelineQueue, id: &str) -> dealradar::TaskView {
    let deadline = std::time::Instant::now() + Duration::from_secs(20);
    loop {
        let view = queue.get(id).unwrap();
        if view.status.is_terminal() {
            return view;
        }
        assert!(std::time::Instant::now() < deadline, "task stuck: {:?}", view);
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_steps_run_in_order_in_working_directory() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(
        temp.path(),
        json!([
            sh("01_discover_ir", "echo one >> trace.txt; echo 'found 1 url'"),
            sh("02_pdf_links", "echo two >> trace.txt; printf 'a\\nb\\nc\\nd\\ne\\nf\\ng\\n'"),
            sh("03_download", "echo three >> trace.txt"),
        ]),
        30,
    );
    let queue = start(&config_path);

    let id = queue
        .submit_batch("acme;Acme Corp;US;https://acme.com;")
        .unwrap();
    let view = wait(&queue, &id);

    assert_eq!(view.status, TaskStatus::Completed, "{:?}", view.error);
    assert_eq!(
        view.steps_completed,
        vec!["01_discover_ir", "02_pdf_links", "03_download"]
    );
    let trace = fs::read_to_string(temp.path().join("work/trace.txt")).unwrap();
    assert_eq!(trace, "one\ntwo\nthree\n");

    // Only the last five output lines of a step are logged.
    let arrows: Vec<&String> = view.log.iter().filter(|l| l.contains("  → ")).collect();
    assert_eq!(arrows.len(), 1 + 5);
    assert!(arrows[1].ends_with("  → c"));
    assert!(arrows[5].ends_with("  → g"));

    let registry = fs::read_to_string(temp.path().join("data/companies.csv")).unwrap();
    assert_eq!(
        registry,
        "company_id;company_name;country;website;ir_url\nacme;Acme Corp;US;https://acme.com;\n"
    );
    queue.wait();
}

#[test]
fn test_failing_step_reports_stderr() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(
        temp.path(),
        json!([
            sh("01_discover_ir", "true"),
            sh("02_pdf_links", "echo 'connection refused' >&2; exit 3"),
            sh("03_download", "touch should_not_exist"),
        ]),
        30,
    );
    let queue = start(&config_path);

    let id = queue.submit_manual(common::acme_record()).unwrap();
    let view = wait(&queue, &id);

    assert_eq!(view.status, TaskStatus::Failed);
    assert_eq!(
        view.error.as_deref(),
        Some("02_pdf_links failed (exit code 3): connection refused")
    );
    assert_eq!(view.current_step.as_deref(), Some("02_pdf_links"));
    assert!(!temp.path().join("work/should_not_exist").exists());
    queue.wait();
}

#[test]
fn test_long_error_output_is_truncated() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(
        temp.path(),
        json!([sh("01_discover_ir", "head -c 2000 /dev/zero | tr '\\0' x >&2; exit 1")]),
        30,
    );
    let queue = start(&config_path);

    let id = queue.submit_manual(common::acme_record()).unwrap();
    let error = wait(&queue, &id).error.unwrap();
    let prefix = "01_discover_ir failed (exit code 1): ";
    assert!(error.starts_with(prefix));
    assert_eq!(error.len() - prefix.len(), 500);
    queue.wait();
}

#[test]
fn test_hung_step_times_out() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(
        temp.path(),
        json!([
            sh("01_discover_ir", "sleep 30"),
            sh("02_pdf_links", "touch should_not_exist"),
        ]),
        1,
    );
    let queue = start(&config_path);

    let started = std::time::Instant::now();
    let id = queue.submit_manual(common::acme_record()).unwrap();
    let view = wait(&queue, &id);

    assert!(started.elapsed() < Duration::from_secs(15));
    assert_eq!(view.status, TaskStatus::Failed);
    let error = view.error.unwrap();
    assert!(error.contains("01_discover_ir"));
    assert!(error.contains("timed out"));
    assert!(!temp.path().join("work/should_not_exist").exists());
    queue.wait();
}

#[test]
fn test_missing_program_fails_task() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(
        temp.path(),
        json!([{ "id": "01_discover_ir", "program": "/nonexistent/dealradar-step" }]),
        30,
    );
    let queue = start(&config_path);

    let id = queue.submit_manual(common::acme_record()).unwrap();
    let view = wait(&queue, &id);

    assert_eq!(view.status, TaskStatus::Failed);
    assert!(view
        .error
        .unwrap()
        .contains("program not found: /nonexistent/dealradar-step"));
    queue.wait();
}
