use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use wizflow::core::config::{ConfigLoader, ConfigValidator};

fn clear_wizflow_env() {
    for v in &[
        "WIZFLOW_WORKFLOWS_DIR",
        "WIZFLOW_WORKSPACE_DIR",
        "WIZFLOW_INTERPRETER",
        "WIZFLOW_TIMEOUT_SECONDS",
        "WIZFLOW_GRACE_PERIOD_MS",
        "WIZFLOW_OUTPUT_LIMIT_BYTES",
        "WIZFLOW_TRANSLATOR_COMMAND",
    ] {
        env::remove_var(v);
    }
}

#[test]
#[serial]
fn test_defaults_without_config_file() {
    clear_wizflow_env();
    let temp_dir = TempDir::new().unwrap();

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();

    assert_eq!(config.storage.workflows_dir, PathBuf::from("workflows"));
    assert_eq!(config.storage.workspace_dir, PathBuf::from("workspace"));
    assert_eq!(config.executor.interpreter, "python3");
    assert_eq!(config.executor.timeout(), Duration::from_secs(300));
    assert_eq!(config.executor.grace_period(), Duration::from_millis(2000));
    assert_eq!(config.executor.output_limit_bytes, 1_048_576);
    assert!(config.translator.command.is_none());
    assert!(ConfigValidator::validate(&config).is_ok());
}

#[test]
#[serial]
fn test_config_loading_integration() {
    clear_wizflow_env();
    let temp_dir = TempDir::new().unwrap();

    let config_content = r#"
[storage]
workflows_dir = "flows"

[executor]
interpreter = "/usr/bin/python3"
timeout_seconds = 45
passthrough_env = ["PATH", "HOME"]

[dependencies]
installer = ["uv", "pip", "install"]

[dependencies.package_aliases]
magic = "python-magic"

[translator]
command = "llm-bridge --json"
timeout_seconds = 20
"#;
    fs::write(temp_dir.path().join("wizflow.toml"), config_content).unwrap();

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();

    assert_eq!(config.storage.workflows_dir, PathBuf::from("flows"));
    assert_eq!(config.storage.workspace_dir, PathBuf::from("workspace"));
    assert_eq!(config.executor.interpreter, "/usr/bin/python3");
    assert_eq!(config.executor.timeout_seconds, 45);
    assert_eq!(config.executor.passthrough_env, vec!["PATH", "HOME"]);
    assert_eq!(config.dependencies.installer, vec!["uv", "pip", "install"]);
    assert_eq!(
        config.dependencies.package_aliases.get("magic").map(String::as_str),
        Some("python-magic")
    );
    assert_eq!(config.translator.command.as_deref(), Some("llm-bridge --json"));
    assert_eq!(config.translator.timeout_seconds, 20);
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    clear_wizflow_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("wizflow.toml"),
        "[executor]\ninterpreter = \"python3.11\"\ntimeout_seconds = 10\n",
    )
    .unwrap();

    env::set_var("WIZFLOW_INTERPRETER", "sh");
    env::set_var("WIZFLOW_TIMEOUT_SECONDS", "7");
    env::set_var("WIZFLOW_OUTPUT_LIMIT_BYTES", "not-a-number");
    env::set_var("WIZFLOW_TRANSLATOR_COMMAND", "cat");

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    clear_wizflow_env();

    assert_eq!(config.executor.interpreter, "sh");
    assert_eq!(config.executor.timeout_seconds, 7);
    assert_eq!(config.executor.output_limit_bytes, 1_048_576);
    assert_eq!(config.translator.command.as_deref(), Some("cat"));
}

#[test]
#[serial]
fn test_malformed_file_is_configuration_error() {
    clear_wizflow_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("wizflow.toml"), "[executor\ninterpreter = ").unwrap();

    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.code, "WIZ-CFG-001");
}

#[test]
#[serial]
fn test_validator_rejects_zero_timeout() {
    clear_wizflow_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("wizflow.toml"),
        "[executor]\ntimeout_seconds = 0\n",
    )
    .unwrap();

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert_eq!(err.code, "WIZ-CFG-002");
}

#[test]
fn test_env_documentation_lists_every_override() {
    let docs = ConfigLoader::env_var_documentation();
    assert_eq!(docs.len(), 7);
    assert!(docs.iter().all(|line| line.starts_with("WIZFLOW_")));
}
