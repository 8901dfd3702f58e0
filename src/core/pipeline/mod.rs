//! Stage wiring: document → generate → validate → persist → dependencies →
//! execute. Each stage fails closed; nothing after a failed stage runs.

use crate::core::codegen::{used_templates, CodeGenerator, GeneratedScript};
use crate::core::config::WizflowConfig;
use crate::core::dependencies::{DependencyAnalyzer, DependencyReport, PythonModuleProbe};
use crate::core::document::{check_name, slugify, WorkflowDocument};
use crate::core::error::{AppError, PipelineError};
use crate::core::executor::{
    ExecutionEnvironment, ExecutionRequest, ExecutionResult, ScriptRunner, WorkflowExecutor,
};
use crate::core::store::WorkflowStore;
use crate::core::translator::WorkflowTranslator;
use crate::core::types::{ErrorCategory, PipelineStage};
use crate::core::validator::{ValidationReport, Validator};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const WORKSPACE_ENV: &str = "WIZFLOW_WORKSPACE";
pub const TRIGGER_PAYLOAD_ENV: &str = "WIZFLOW_TRIGGER_PAYLOAD";
pub const RECORD_FILE_ENV: &str = "WIZFLOW_RECORD_FILE";

/// A document that passed generation and validation.
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    pub document: WorkflowDocument,
    pub script: GeneratedScript,
    pub report: ValidationReport,
    /// Set once the script has been written to the store.
    pub script_path: Option<PathBuf>,
}

/// Per-run knobs.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Execute even when the dependency pre-flight reports missing modules.
    pub force: bool,
    pub timeout: Option<Duration>,
    /// Side-effecting helpers append JSON lines here instead of acting.
    pub record_file: Option<PathBuf>,
    pub trigger_payload: Option<Value>,
}

pub struct WorkflowPipeline {
    generator: CodeGenerator,
    validator: Validator,
    store: WorkflowStore,
    dependencies: DependencyAnalyzer,
    runner: Arc<dyn ScriptRunner>,
    workspace_dir: PathBuf,
}

impl WorkflowPipeline {
    /// Build the pipeline for a workspace root. Relative directories in the
    /// config resolve against `root`.
    pub fn from_config(root: &Path, config: &WizflowConfig) -> Self {
        let probe = PythonModuleProbe::new(
            config.executor.interpreter.clone(),
            config.executor.passthrough_env.clone(),
        );
        Self {
            generator: CodeGenerator::new(),
            validator: Validator::new(),
            store: WorkflowStore::new(root.join(&config.storage.workflows_dir)),
            dependencies: DependencyAnalyzer::new(Box::new(probe), &config.dependencies),
            runner: Arc::new(WorkflowExecutor::from_config(&config.executor)),
            workspace_dir: root.join(&config.storage.workspace_dir),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn ScriptRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_dependencies(mut self, dependencies: DependencyAnalyzer) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    pub fn dependencies(&self) -> &DependencyAnalyzer {
        &self.dependencies
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    /// Generate and validate without writing anything.
    pub fn check(&self, document: &WorkflowDocument) -> Result<CompiledWorkflow, PipelineError> {
        let reasons = document.structural_issues();
        if !reasons.is_empty() {
            stage_failed(&document.name, PipelineStage::Generate, &reasons);
            return Err(PipelineError::Document { reasons });
        }

        let script = self.generator.generate(document);
        let digest = script.digest();
        tracing::info!(
            workflow = %document.name,
            stage = %PipelineStage::Generate,
            digest = %digest,
            modules = script.modules.len(),
            "script generated"
        );

        let report = self.validator.validate(document, &script);
        for warning in report.warnings() {
            tracing::warn!(workflow = %document.name, code = %warning.code, "{}", warning.message);
        }
        if !report.passed() {
            let reasons = report.reasons();
            stage_failed(&document.name, PipelineStage::Validate, &reasons);
            return Err(PipelineError::Generation { reasons });
        }
        tracing::info!(
            workflow = %document.name,
            stage = %PipelineStage::Validate,
            digest = %digest,
            warnings = report.warnings().count(),
            "script validated"
        );

        Ok(CompiledWorkflow {
            document: document.clone(),
            script,
            report,
            script_path: None,
        })
    }

    /// Check, then persist the document and its script. A rejected script is
    /// never written, so a previously saved version stays in place.
    pub fn compile(&self, document: &WorkflowDocument) -> Result<CompiledWorkflow, PipelineError> {
        let mut compiled = self.check(document)?;
        self.store.save_document(document)?;
        let path = self.store.save_script(&compiled.script)?;
        tracing::info!(
            workflow = %document.name,
            stage = %PipelineStage::Persist,
            digest = %compiled.script.digest(),
            path = %path.display(),
            "script saved"
        );
        compiled.script_path = Some(path);
        Ok(compiled)
    }

    /// Translate a description and compile the resulting document.
    pub async fn generate(
        &self,
        translator: &dyn WorkflowTranslator,
        description: &str,
        name: Option<&str>,
    ) -> Result<CompiledWorkflow, PipelineError> {
        let mut document = translator.translate(description).await.map_err(|err| {
            stage_failed("-", PipelineStage::Translate, &[err.to_string()]);
            err
        })?;
        match name {
            Some(name) => document.name = name.to_string(),
            None if check_name(&document.name).is_err() => {
                document.name = slugify(&document.name);
            }
            None => {}
        }
        if document.description.is_none() {
            document.description = Some(description.trim().to_string());
        }
        tracing::info!(
            workflow = %document.name,
            stage = %PipelineStage::Translate,
            actions = document.actions.len(),
            "description translated"
        );
        self.compile(&document)
    }

    /// Probe the modules a script imports.
    pub async fn preflight(&self, script: &GeneratedScript) -> Result<DependencyReport, PipelineError> {
        let report = self
            .dependencies
            .analyze(&script.modules)
            .await
            .map_err(PipelineError::DependencyProbe)?;
        tracing::info!(
            workflow = %script.workflow,
            stage = %PipelineStage::Dependencies,
            missing = report.missing.len(),
            "dependencies checked"
        );
        Ok(report)
    }

    /// Full pipeline for one document.
    pub async fn run(
        &self,
        document: &WorkflowDocument,
        options: &RunOptions,
    ) -> Result<ExecutionResult, PipelineError> {
        let compiled = self.compile(document)?;

        let report = self.preflight(&compiled.script).await?;
        if !report.is_satisfied() {
            if options.force {
                tracing::warn!(
                    workflow = %document.name,
                    missing = ?report.missing,
                    "running despite missing modules"
                );
            } else {
                stage_failed(&document.name, PipelineStage::Dependencies, &report.missing);
                return Err(PipelineError::DependencyMissing {
                    modules: report.missing,
                });
            }
        }

        let script_path = match compiled.script_path {
            Some(path) => absolutize(&path)?,
            None => absolutize(&self.store.script_path(&document.name)?)?,
        };
        let environment = self.environment(document, options)?;
        let mut request = ExecutionRequest::new(script_path, environment);
        if let Some(timeout) = options.timeout {
            request = request.with_timeout(timeout);
        }

        let result = self.runner.run(request).await;
        tracing::info!(
            workflow = %document.name,
            stage = %PipelineStage::Execute,
            digest = %compiled.script.digest(),
            outcome = %result.outcome,
            elapsed_ms = result.elapsed_ms,
            "workflow run finished"
        );
        Ok(result)
    }

    fn environment(
        &self,
        document: &WorkflowDocument,
        options: &RunOptions,
    ) -> Result<ExecutionEnvironment, PipelineError> {
        std::fs::create_dir_all(&self.workspace_dir).map_err(|err| {
            AppError::new(
                ErrorCategory::StorageError,
                format!(
                    "failed to create workspace {}: {}",
                    self.workspace_dir.display(),
                    err
                ),
            )
            .with_code("WIZ-STORE-004")
        })?;
        let workspace = absolutize(&self.workspace_dir)?;

        let mut environment = ExecutionEnvironment::new(workspace.clone())
            .with_var(WORKSPACE_ENV, workspace.display().to_string());

        for template in used_templates(document) {
            for key in template.credentials {
                if let Ok(value) = std::env::var(key) {
                    environment = environment.with_var(*key, value);
                }
            }
        }
        if let Some(payload) = &options.trigger_payload {
            environment = environment.with_var(TRIGGER_PAYLOAD_ENV, payload.to_string());
        }
        if let Some(record_file) = &options.record_file {
            environment =
                environment.with_var(RECORD_FILE_ENV, absolutize(record_file)?.display().to_string());
        }
        Ok(environment)
    }
}

fn absolutize(path: &Path) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to resolve current directory: {}", err),
        )
    })?;
    Ok(cwd.join(path))
}

fn stage_failed(workflow: &str, stage: PipelineStage, reasons: &[String]) {
    tracing::warn!(
        workflow = %workflow,
        stage = %stage,
        reasons = %reasons.join("; "),
        "stage failed"
    );
}
