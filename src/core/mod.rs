pub mod codegen;
pub mod config;
pub mod dependencies;
pub mod document;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod store;
pub mod translator;
pub mod types;
pub mod validator;

pub use codegen::{CodeGenerator, GeneratedScript};
pub use config::{ConfigLoader, ConfigValidator, WizflowConfig};
pub use dependencies::{DependencyAnalyzer, DependencyReport, InstallReport, ModuleProbe};
pub use document::{ActionStep, ActionType, Trigger, TriggerType, WorkflowDocument};
pub use error::{AppError, DefaultErrorReporter, ErrorReporter, PipelineError, TranslationError};
pub use executor::{ExecutionOutcome, ExecutionRequest, ExecutionResult, ScriptRunner, WorkflowExecutor};
pub use pipeline::{CompiledWorkflow, RunOptions, WorkflowPipeline};
pub use store::WorkflowStore;
pub use translator::{CommandTranslator, WorkflowTranslator};
pub use types::*;
pub use validator::{IssueSeverity, ValidationIssue, ValidationReport, Validator};
