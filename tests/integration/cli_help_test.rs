use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::{contains, starts_with};
use std::fs;
use tempfile::TempDir;

const BIN: &str = "wizflow";

fn wizflow(root: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin(BIN).expect("binary should build");
    cmd.arg("--root")
        .arg(root.path())
        .env("WIZFLOW_LOG_FILE", "false")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn version_flag_prints_crate_version() {
    let expected = format!("{BIN} {}", wizflow::VERSION);

    Command::cargo_bin(BIN)
        .expect("binary should build")
        .arg("--version")
        .assert()
        .success()
        .stdout(starts_with(expected));
}

#[test]
fn help_lists_every_workflow_command() {
    let assert = Command::cargo_bin(BIN)
        .expect("binary should build")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("WORKFLOW COMMANDS:"));

    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    for command in ["generate", "compile", "check", "deps", "run", "list", "remove"] {
        assert!(output.contains(command), "help is missing {command}");
    }
}

#[test]
fn run_help_documents_timeout_and_record() {
    Command::cargo_bin(BIN)
        .expect("binary should build")
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(contains("--timeout").and(contains("--record")).and(contains("--force")));
}

#[test]
fn list_on_empty_root_prints_json_array() {
    let root = TempDir::new().unwrap();
    wizflow(&root)
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(contains("[]"));
}

#[test]
fn check_reports_missing_parameter_with_nonzero_exit() {
    let root = TempDir::new().unwrap();
    let doc = root.path().join("partial.json");
    fs::write(
        &doc,
        r#"{"name": "partial", "actions": [{"type": "email", "parameters": {"to": "a@b.com"}}]}"#,
    )
    .unwrap();

    wizflow(&root)
        .args(["check", doc.to_str().unwrap(), "--json"])
        .assert()
        .code(2)
        .stdout(contains("\"status\": \"rejected\"").and(contains("WIZ-VAL-001")));

    assert!(!root.path().join("workflows").exists());
}

#[test]
fn compile_then_list_shows_saved_workflow() {
    let root = TempDir::new().unwrap();
    let doc = root.path().join("alert.json");
    fs::write(
        &doc,
        r#"{"name": "alert", "actions": [{"type": "email", "parameters": {"to": "a@b.com", "subject": "hi", "body": "test"}}]}"#,
    )
    .unwrap();

    wizflow(&root)
        .args(["compile", doc.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Compiled alert"));

    assert!(root.path().join("workflows/alert.py").is_file());

    wizflow(&root)
        .arg("list")
        .assert()
        .success()
        .stdout(contains("alert"));
}

#[test]
fn unknown_saved_name_fails_with_recovery_hint() {
    let root = TempDir::new().unwrap();
    wizflow(&root)
        .args(["check", "never-saved"])
        .assert()
        .failure()
        .stderr(
            contains("[ERROR] WIZ-STORE-002")
                .and(contains("Hint: run `wizflow list` to see saved workflows")),
        );
}

#[test]
fn generate_without_translator_is_rejected() {
    let root = TempDir::new().unwrap();
    wizflow(&root)
        .env_remove("WIZFLOW_TRANSLATOR_COMMAND")
        .args(["generate", "email me daily"])
        .assert()
        .code(2)
        .stderr(contains("translate stage failed"));
}

#[test]
fn invalid_timeout_is_a_usage_error() {
    let root = TempDir::new().unwrap();
    wizflow(&root)
        .args(["run", "alert", "--timeout", "soon"])
        .assert()
        .failure()
        .stderr(contains("--timeout"));
}

#[test]
fn remove_deletes_saved_workflow_once() {
    let root = TempDir::new().unwrap();
    let doc = root.path().join("alert.json");
    fs::write(
        &doc,
        r#"{"name": "alert", "actions": [{"type": "data", "parameters": {"message": "hi"}}]}"#,
    )
    .unwrap();
    wizflow(&root).args(["compile", doc.to_str().unwrap()]).assert().success();

    wizflow(&root)
        .args(["remove", "alert"])
        .assert()
        .success()
        .stdout(contains("Removed alert"));
    assert!(!root.path().join("workflows/alert.py").exists());
    assert!(!root.path().join("workflows/alert.json").exists());

    wizflow(&root)
        .args(["remove", "alert"])
        .assert()
        .failure()
        .stderr(contains("WIZ-STORE-002"));
}
