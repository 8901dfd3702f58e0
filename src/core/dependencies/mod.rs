#![allow(clippy::result_large_err)]

//! Dependency pre-flight: which modules a script needs that the target
//! interpreter cannot import, and an explicit installer for them.

use crate::core::config::DependencyConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::validator::syntax;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

const PROBE_SCRIPT: &str = r#"import importlib.util, json, sys
missing = []
for name in sys.argv[1:]:
    try:
        found = importlib.util.find_spec(name) is not None
    except (ImportError, ValueError):
        found = False
    if not found:
        missing.append(name)
print(json.dumps(missing))
"#;

/// Module names whose installable package is named differently.
const BUILT_IN_PACKAGE_ALIASES: &[(&str, &str)] = &[
    ("bs4", "beautifulsoup4"),
    ("yaml", "PyYAML"),
    ("cv2", "opencv-python"),
    ("PIL", "Pillow"),
    ("sklearn", "scikit-learn"),
    ("dateutil", "python-dateutil"),
    ("dotenv", "python-dotenv"),
];

/// Answers whether modules are importable by the target interpreter.
#[async_trait]
pub trait ModuleProbe: Send + Sync {
    /// Return the subset of `modules` that cannot be imported.
    async fn missing(&self, modules: &BTreeSet<String>) -> Result<BTreeSet<String>, AppError>;
}

/// Asks a Python interpreter via `importlib.util.find_spec`. Nothing from the
/// workflow script is imported or run.
#[derive(Debug, Clone)]
pub struct PythonModuleProbe {
    interpreter: String,
    passthrough_env: Vec<String>,
}

impl PythonModuleProbe {
    pub fn new(interpreter: impl Into<String>, passthrough_env: Vec<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            passthrough_env,
        }
    }
}

#[async_trait]
impl ModuleProbe for PythonModuleProbe {
    async fn missing(&self, modules: &BTreeSet<String>) -> Result<BTreeSet<String>, AppError> {
        if modules.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut command = Command::new(&self.interpreter);
        command
            .arg("-c")
            .arg(PROBE_SCRIPT)
            .args(modules)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for key in &self.passthrough_env {
            if let Ok(value) = std::env::var(key) {
                command.env(key, value);
            }
        }

        let output = tokio::time::timeout(PROBE_TIMEOUT, command.output())
            .await
            .map_err(|_| {
                AppError::new(
                    ErrorCategory::TimeoutError,
                    format!("module probe timed out after {}s", PROBE_TIMEOUT.as_secs()),
                )
                .with_code("WIZ-DEP-001")
            })?
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::DependencyError,
                    format!("failed to start '{}' for module probe: {}", self.interpreter, err),
                )
                .with_code("WIZ-DEP-001")
                .with_suggestion("check executor.interpreter in wizflow.toml")
            })?;

        if !output.status.success() {
            return Err(AppError::new(
                ErrorCategory::DependencyError,
                format!(
                    "module probe exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            )
            .with_code("WIZ-DEP-002"));
        }

        let missing: Vec<String> = serde_json::from_slice(&output.stdout).map_err(|err| {
            AppError::new(
                ErrorCategory::DependencyError,
                format!("module probe printed unexpected output: {}", err),
            )
            .with_code("WIZ-DEP-002")
        })?;
        Ok(missing.into_iter().collect())
    }
}

/// Result of a pre-flight check. Both lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    pub available: Vec<String>,
    pub missing: Vec<String>,
}

impl DependencyReport {
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallFailure {
    pub package: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub failed: Vec<InstallFailure>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct DependencyAnalyzer {
    probe: Box<dyn ModuleProbe>,
    installer: Vec<String>,
    install_timeout: Duration,
    package_aliases: BTreeMap<String, String>,
}

impl DependencyAnalyzer {
    pub fn new(probe: Box<dyn ModuleProbe>, config: &DependencyConfig) -> Self {
        let mut package_aliases: BTreeMap<String, String> = BUILT_IN_PACKAGE_ALIASES
            .iter()
            .map(|(module, package)| (module.to_string(), package.to_string()))
            .collect();
        package_aliases.extend(config.package_aliases.clone());
        Self {
            probe,
            installer: config.installer.clone(),
            install_timeout: Duration::from_secs(config.install_timeout_seconds),
            package_aliases,
        }
    }

    /// Split `modules` into importable and missing.
    pub async fn analyze(&self, modules: &BTreeSet<String>) -> Result<DependencyReport, AppError> {
        let missing = self.probe.missing(modules).await?;
        let available = modules
            .iter()
            .filter(|module| !missing.contains(*module))
            .cloned()
            .collect();
        let report = DependencyReport {
            available,
            missing: missing.into_iter().collect(),
        };
        tracing::debug!(
            available = report.available.len(),
            missing = ?report.missing,
            "dependency probe finished"
        );
        Ok(report)
    }

    /// Package name to install for a module.
    pub fn package_for(&self, module: &str) -> String {
        let top_level = module.split('.').next().unwrap_or(module);
        self.package_aliases
            .get(module)
            .or_else(|| self.package_aliases.get(top_level))
            .cloned()
            .unwrap_or_else(|| top_level.to_string())
    }

    /// Install packages for the given modules, one installer run per package.
    /// Never called implicitly by the pipeline.
    pub async fn install(&self, modules: &[String]) -> InstallReport {
        let packages: BTreeSet<String> = modules.iter().map(|m| self.package_for(m)).collect();
        let mut report = InstallReport::default();

        let Some((program, base_args)) = self.installer.split_first() else {
            report.failed = packages
                .into_iter()
                .map(|package| InstallFailure {
                    package,
                    reason: "no installer command configured".to_string(),
                })
                .collect();
            return report;
        };

        for package in packages {
            tracing::info!(%package, "installing package");
            let mut command = Command::new(program);
            command
                .args(base_args)
                .arg(&package)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            match tokio::time::timeout(self.install_timeout, command.output()).await {
                Ok(Ok(output)) if output.status.success() => report.installed.push(package),
                Ok(Ok(output)) => {
                    let reason = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    report.failed.push(InstallFailure {
                        package,
                        reason: if reason.is_empty() {
                            format!("installer exited with {}", output.status)
                        } else {
                            reason
                        },
                    });
                }
                Ok(Err(err)) => report.failed.push(InstallFailure {
                    package,
                    reason: format!("failed to start installer: {}", err),
                }),
                Err(_) => report.failed.push(InstallFailure {
                    package,
                    reason: format!(
                        "installer timed out after {}s",
                        self.install_timeout.as_secs()
                    ),
                }),
            }
        }
        report
    }
}

/// Modules imported by script text, for scripts not produced in this process.
pub fn extract_imports(source: &str) -> BTreeSet<String> {
    syntax::scan(source)
        .imported_modules()
        .into_iter()
        .map(|(module, _)| module)
        .collect()
}
