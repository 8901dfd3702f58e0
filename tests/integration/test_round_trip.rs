//! End-to-end runs through a real Python interpreter. Each test returns early
//! when `python3` is not on `PATH`.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use wizflow::core::config::WizflowConfig;
use wizflow::core::document::{ActionStep, ActionType, Trigger, WorkflowDocument};
use wizflow::core::executor::ExecutionOutcome;
use wizflow::core::pipeline::{RunOptions, WorkflowPipeline};

fn python_available() -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    let found = std::env::split_paths(&path).any(|dir| dir.join("python3").is_file());
    if !found {
        eprintln!("python3 not found on PATH; skipping");
    }
    found
}

fn python_has(modules: &str) -> bool {
    let importable = std::process::Command::new("python3")
        .arg("-c")
        .arg(format!("import {modules}"))
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);
    if !importable {
        eprintln!("python3 cannot import {modules}; skipping");
    }
    importable
}

fn pipeline(dir: &TempDir) -> WorkflowPipeline {
    let mut config = WizflowConfig::default();
    config.executor.timeout_seconds = 60;
    WorkflowPipeline::from_config(dir.path(), &config)
}

#[tokio::test]
async fn alert_round_trip_records_email() {
    if !python_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let document = WorkflowDocument::from_json_str(
        r#"{"name": "alert", "trigger": {"type": "manual"},
            "actions": [{"type": "email", "parameters": {"to": "a@b.com", "subject": "hi", "body": "test"}}]}"#,
    )
    .unwrap();
    let record: PathBuf = dir.path().join("calls.jsonl");
    let options = RunOptions {
        record_file: Some(record.clone()),
        ..RunOptions::default()
    };

    let result = pipeline(&dir).run(&document, &options).await.unwrap();

    assert_eq!(result.outcome, ExecutionOutcome::Success, "{}", result.stderr);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.stdout.contains("recorded email to a@b.com"));

    let recorded = fs::read_to_string(&record).unwrap();
    let lines: Vec<&str> = recorded.lines().collect();
    assert_eq!(lines.len(), 1);
    let call: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(call["action"], "email");
    assert_eq!(call["to"], "a@b.com");
    assert_eq!(call["subject"], "hi");
    assert_eq!(call["body"], "test");
}

#[tokio::test]
async fn earlier_results_flow_into_later_actions() {
    if !python_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let document = WorkflowDocument::new(
        "notes",
        Trigger::manual(),
        vec![
            ActionStep::new(ActionType::File)
                .with_param("path", "notes/today.txt")
                .with_param("operation", "write")
                .with_param("content", "First point. Second point. Third point."),
            ActionStep::new(ActionType::File)
                .with_param("path", "notes/today.txt")
                .with_param("store_as", "notes"),
            ActionStep::new(ActionType::Ai)
                .with_param("text", "{{notes}}")
                .with_param("max_sentences", 1),
        ],
    );

    let result = pipeline(&dir)
        .run(&document, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.outcome, ExecutionOutcome::Success, "{}", result.stderr);
    assert!(result.stdout.contains("summary: First point."));
    assert!(dir.path().join("workspace/notes/today.txt").is_file());
}

#[tokio::test]
async fn unknown_actions_are_skipped_at_run_time() {
    if !python_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let document = WorkflowDocument::new(
        "mixed",
        Trigger::manual(),
        vec![
            ActionStep::new(ActionType::Data).with_param("message", "before"),
            ActionStep::new(ActionType::Custom("teleport".into())),
            ActionStep::new(ActionType::Data).with_param("message", "after"),
        ],
    );

    let result = pipeline(&dir)
        .run(&document, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.outcome, ExecutionOutcome::Success, "{}", result.stderr);
    let before = result.stdout.find("[INFO] before").unwrap();
    let skipped = result.stdout.find("skipping unrecognized action 2").unwrap();
    let after = result.stdout.find("[INFO] after").unwrap();
    assert!(before < skipped && skipped < after);
}

#[tokio::test]
async fn failing_action_is_runtime_failure_with_stderr() {
    if !python_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let document = WorkflowDocument::new(
        "reader",
        Trigger::manual(),
        vec![ActionStep::new(ActionType::File).with_param("path", "does/not/exist.txt")],
    );

    let result = pipeline(&dir)
        .run(&document, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.outcome, ExecutionOutcome::RuntimeFailure);
    assert_eq!(result.exit_code, Some(1));
    assert!(result.stderr.contains("workflow reader failed"));
}

#[tokio::test]
async fn trigger_payload_reaches_the_script() {
    if !python_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let document = WorkflowDocument::from_json_str(
        r#"{"name": "forward", "trigger": {"type": "email"},
            "actions": [{"type": "data", "parameters": {"message": "mail from {{email.from}}"}}]}"#,
    )
    .unwrap();
    let options = RunOptions {
        trigger_payload: Some(serde_json::json!({"from": "boss@example.com"})),
        ..RunOptions::default()
    };

    let result = pipeline(&dir).run(&document, &options).await.unwrap();

    assert_eq!(result.outcome, ExecutionOutcome::Success, "{}", result.stderr);
    assert!(result.stdout.contains("mail from boss@example.com"));
}

#[tokio::test]
async fn scrape_records_url_and_selector() {
    if !python_available() || !python_has("bs4, requests") {
        return;
    }
    let dir = TempDir::new().unwrap();
    let document = WorkflowDocument::from_json_str(
        r#"{"name": "headlines",
            "actions": [{"type": "web_scrape", "config": {"url": "https://example.com/news", "selector": "h2.title"}}]}"#,
    )
    .unwrap();
    let record = dir.path().join("calls.jsonl");
    let options = RunOptions {
        record_file: Some(record.clone()),
        ..RunOptions::default()
    };

    let result = pipeline(&dir).run(&document, &options).await.unwrap();

    assert_eq!(result.outcome, ExecutionOutcome::Success, "{}", result.stderr);
    assert!(result.stdout.contains("recorded scrape of https://example.com/news"));
    let call: serde_json::Value =
        serde_json::from_str(fs::read_to_string(&record).unwrap().trim()).unwrap();
    assert_eq!(call["action"], "scrape");
    assert_eq!(call["selector"], "h2.title");
}
