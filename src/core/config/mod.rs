use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration loaded from wizflow.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WizflowConfig {
    /// Where documents and scripts live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Script execution settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Dependency probing and installation
    #[serde(default)]
    pub dependencies: DependencyConfig,

    /// Natural-language translator bridge
    #[serde(default)]
    pub translator: TranslatorConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `<name>.json` and `<name>.py`, relative to the workspace root
    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: PathBuf,

    /// Working directory for executed scripts; file actions are confined to it
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,
}

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Interpreter used to run generated scripts
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Wall-clock limit for one run
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Time between SIGTERM and SIGKILL once the timeout fires
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Per-stream capture limit
    #[serde(default = "default_output_limit_bytes")]
    pub output_limit_bytes: usize,

    /// Parent environment variables copied into the child
    #[serde(default = "default_passthrough_env")]
    pub passthrough_env: Vec<String>,
}

/// Dependency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Installer command; the package name is appended
    #[serde(default = "default_installer")]
    pub installer: Vec<String>,

    #[serde(default = "default_install_timeout_seconds")]
    pub install_timeout_seconds: u64,

    /// Module name to package name, merged over the built-in aliases
    #[serde(default)]
    pub package_aliases: BTreeMap<String, String>,
}

/// Translator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// External command that reads a description on stdin and prints a document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default = "default_translator_timeout_seconds")]
    pub timeout_seconds: u64,
}

// Default functions
fn default_workflows_dir() -> PathBuf {
    PathBuf::from("workflows")
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("workspace")
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_grace_period_ms() -> u64 {
    2000
}

fn default_output_limit_bytes() -> usize {
    1_048_576
}

fn default_passthrough_env() -> Vec<String> {
    ["PATH", "LANG", "LC_ALL", "TZ"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn default_installer() -> Vec<String> {
    ["python3", "-m", "pip", "install"]
        .iter()
        .map(|part| part.to_string())
        .collect()
}

fn default_install_timeout_seconds() -> u64 {
    120
}

fn default_translator_timeout_seconds() -> u64 {
    60
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            workflows_dir: default_workflows_dir(),
            workspace_dir: default_workspace_dir(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            interpreter: default_interpreter(),
            timeout_seconds: default_timeout_seconds(),
            grace_period_ms: default_grace_period_ms(),
            output_limit_bytes: default_output_limit_bytes(),
            passthrough_env: default_passthrough_env(),
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for DependencyConfig {
    fn default() -> Self {
        DependencyConfig {
            installer: default_installer(),
            install_timeout_seconds: default_install_timeout_seconds(),
            package_aliases: BTreeMap::new(),
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        TranslatorConfig {
            command: None,
            timeout_seconds: default_translator_timeout_seconds(),
        }
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
