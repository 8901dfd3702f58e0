#![allow(clippy::result_large_err)]

use super::WizflowConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "wizflow.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/wizflow.toml)
    /// Environment variables override config file values
    pub fn load_from_workspace(workspace_path: &Path) -> Result<WizflowConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();

        Self::apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<WizflowConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: WizflowConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("WIZ-CFG-001")
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration.
    /// Values that fail to parse are ignored.
    fn apply_env_overrides(config: &mut WizflowConfig) {
        if let Ok(dir) = env::var("WIZFLOW_WORKFLOWS_DIR") {
            config.storage.workflows_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = env::var("WIZFLOW_WORKSPACE_DIR") {
            config.storage.workspace_dir = PathBuf::from(dir);
        }

        if let Ok(interpreter) = env::var("WIZFLOW_INTERPRETER") {
            config.executor.interpreter = interpreter;
        }

        if let Ok(timeout_str) = env::var("WIZFLOW_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                config.executor.timeout_seconds = timeout;
            }
        }

        if let Ok(grace_str) = env::var("WIZFLOW_GRACE_PERIOD_MS") {
            if let Ok(grace) = grace_str.parse::<u64>() {
                config.executor.grace_period_ms = grace;
            }
        }

        if let Ok(limit_str) = env::var("WIZFLOW_OUTPUT_LIMIT_BYTES") {
            if let Ok(limit) = limit_str.parse::<usize>() {
                config.executor.output_limit_bytes = limit;
            }
        }

        if let Ok(command) = env::var("WIZFLOW_TRANSLATOR_COMMAND") {
            config.translator.command = Some(command);
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "WIZFLOW_WORKFLOWS_DIR - Override the workflow storage directory (default: workflows)",
            "WIZFLOW_WORKSPACE_DIR - Override the script working directory (default: workspace)",
            "WIZFLOW_INTERPRETER - Override the script interpreter (default: python3)",
            "WIZFLOW_TIMEOUT_SECONDS - Override the run timeout (default: 300)",
            "WIZFLOW_GRACE_PERIOD_MS - Override the SIGTERM grace period (default: 2000)",
            "WIZFLOW_OUTPUT_LIMIT_BYTES - Override the per-stream capture limit (default: 1048576)",
            "WIZFLOW_TRANSLATOR_COMMAND - Override the translator command",
        ]
    }
}
