use async_trait::async_trait;
use std::collections::BTreeSet;
use wizflow::core::config::DependencyConfig;
use wizflow::core::dependencies::{extract_imports, DependencyAnalyzer, ModuleProbe, PythonModuleProbe};
use wizflow::core::error::AppError;

struct FixedProbe {
    missing: BTreeSet<String>,
}

#[async_trait]
impl ModuleProbe for FixedProbe {
    async fn missing(&self, modules: &BTreeSet<String>) -> Result<BTreeSet<String>, AppError> {
        Ok(modules.intersection(&self.missing).cloned().collect())
    }
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn analyzer_with(installer: &[&str], missing: &[&str]) -> DependencyAnalyzer {
    let config = DependencyConfig {
        installer: installer.iter().map(|part| part.to_string()).collect(),
        ..DependencyConfig::default()
    };
    DependencyAnalyzer::new(Box::new(FixedProbe { missing: set(missing) }), &config)
}

#[tokio::test]
async fn report_lists_are_sorted() {
    let analyzer = analyzer_with(&["true"], &["yaml", "bs4"]);
    let report = analyzer
        .analyze(&set(&["yaml", "json", "bs4", "csv"]))
        .await
        .unwrap();

    assert_eq!(report.available, vec!["csv", "json"]);
    assert_eq!(report.missing, vec!["bs4", "yaml"]);
}

#[tokio::test]
async fn nothing_missing_is_satisfied() {
    let analyzer = analyzer_with(&["true"], &[]);
    let report = analyzer.analyze(&set(&["json", "os"])).await.unwrap();
    assert!(report.is_satisfied());
}

#[cfg(unix)]
#[tokio::test]
async fn install_runs_once_per_package() {
    let analyzer = analyzer_with(&["true"], &[]);
    let report = analyzer
        .install(&["bs4".to_string(), "bs4.element".to_string(), "yaml".to_string()])
        .await;

    assert!(report.is_complete());
    assert_eq!(report.installed, vec!["PyYAML", "beautifulsoup4"]);
}

#[cfg(unix)]
#[tokio::test]
async fn failing_installer_is_reported_per_package() {
    let analyzer = analyzer_with(&["false"], &[]);
    let report = analyzer.install(&["requests".to_string()]).await;

    assert!(!report.is_complete());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].package, "requests");
    assert!(report.installed.is_empty());
}

#[tokio::test]
async fn empty_installer_fails_every_package() {
    let analyzer = analyzer_with(&[], &[]);
    let report = analyzer.install(&["requests".to_string()]).await;
    assert_eq!(report.failed[0].reason, "no installer command configured");
}

#[tokio::test]
async fn probe_with_missing_interpreter_is_an_error() {
    let probe = PythonModuleProbe::new("wizflow-no-such-python", vec!["PATH".to_string()]);
    assert!(probe.missing(&set(&["json"])).await.is_err());
}

#[tokio::test]
async fn python_probe_finds_stdlib_and_flags_unknown_modules() {
    if which_python().is_none() {
        eprintln!("python3 not found on PATH; skipping");
        return;
    }
    let probe = PythonModuleProbe::new("python3", vec!["PATH".to_string()]);
    let missing = probe
        .missing(&set(&["json", "email.message", "wizflow_surely_absent_module"]))
        .await
        .unwrap();
    assert_eq!(missing, set(&["wizflow_surely_absent_module"]));
}

#[test]
fn imports_are_read_from_script_text() {
    let source = "import json\nimport urllib.request as req\nfrom pathlib import Path\n";
    assert_eq!(extract_imports(source), set(&["json", "pathlib", "urllib.request"]));
}

fn which_python() -> Option<std::path::PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join("python3"))
        .find(|candidate| candidate.is_file())
}
