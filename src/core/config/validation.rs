#![allow(clippy::result_large_err)]

use super::WizflowConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::path::Component;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &WizflowConfig) -> Result<(), AppError> {
        if config.executor.interpreter.trim().is_empty() {
            return Err(invalid("executor.interpreter cannot be empty"));
        }

        if config.executor.timeout_seconds == 0 {
            return Err(invalid("executor.timeout_seconds must be greater than zero"));
        }

        if config.executor.output_limit_bytes == 0 {
            return Err(invalid("executor.output_limit_bytes must be greater than zero"));
        }

        if config.storage.workflows_dir.as_os_str().is_empty() {
            return Err(invalid("storage.workflows_dir cannot be empty"));
        }

        if config.storage.workspace_dir.as_os_str().is_empty() {
            return Err(invalid("storage.workspace_dir cannot be empty"));
        }

        for (key, dir) in [
            ("storage.workflows_dir", &config.storage.workflows_dir),
            ("storage.workspace_dir", &config.storage.workspace_dir),
        ] {
            if dir.components().any(|part| part == Component::ParentDir) {
                return Err(invalid(&format!(
                    "{} must stay inside the workspace root (no '..'): {}",
                    key,
                    dir.display()
                )));
            }
        }

        if config
            .dependencies
            .installer
            .first()
            .map_or(true, |program| program.trim().is_empty())
        {
            return Err(invalid("dependencies.installer must name a program"));
        }

        if let Some(command) = &config.translator.command {
            if command.trim().is_empty() {
                return Err(invalid("translator.command cannot be blank when set"));
            }
        }

        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::new(ErrorCategory::ConfigurationError, message).with_code("WIZ-CFG-002")
}
