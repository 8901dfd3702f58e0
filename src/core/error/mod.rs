use crate::core::types::{ErrorCategory, ErrorSeverity, PipelineStage};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug)]
pub struct AppError {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub code: String,
    pub message: String,
    pub context: HashMap<String, String>,
    pub recovery_suggestions: Vec<String>,
    pub occurred_at: DateTime<Utc>,
    pub source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new<T: Into<String>>(category: ErrorCategory, message: T) -> Self {
        AppError {
            category,
            severity: ErrorSeverity::Error,
            code: format!("ERR-{}", uuid::Uuid::new_v4()),
            message: message.into(),
            context: HashMap::new(),
            recovery_suggestions: vec![],
            occurred_at: chrono::Utc::now(),
            source: None,
        }
    }

    pub fn with_context<T: Into<String>>(mut self, context: T) -> Self {
        self.context.insert("context".to_string(), context.into());
        self
    }

    pub fn with_code<T: Into<String>>(mut self, code: T) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_suggestion<T: Into<String>>(mut self, suggestion: T) -> Self {
        self.recovery_suggestions.push(suggestion.into());
        self
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    pub fn add_context(&mut self, key: &str, value: &str) {
        self.context.insert(key.to_string(), value.to_string());
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.category, self.message)?;
        if !self.context.is_empty() {
            let mut keys: Vec<_> = self.context.keys().collect();
            keys.sort();
            let rendered: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}={}", k, self.context[k]))
                .collect();
            write!(f, " (Context: {})", rendered.join(", "))?;
        }
        if let Some(ref source) = self.source {
            write!(f, "\nCaused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError {
            category: ErrorCategory::InternalError,
            severity: ErrorSeverity::Error,
            code: "ANYHOW_ERROR".to_string(),
            message: e.to_string(),
            context: HashMap::new(),
            recovery_suggestions: vec!["Check the error details".to_string()],
            occurred_at: Utc::now(),
            source: Some(e),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError {
            category: ErrorCategory::IoError,
            severity: ErrorSeverity::Error,
            code: "IO_ERROR".to_string(),
            message: e.to_string(),
            context: HashMap::new(),
            recovery_suggestions: vec!["Check file permissions and paths".to_string()],
            occurred_at: Utc::now(),
            source: Some(anyhow::anyhow!(e)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError {
            category: ErrorCategory::SerializationError,
            severity: ErrorSeverity::Error,
            code: "JSON_ERROR".to_string(),
            message: e.to_string(),
            context: HashMap::new(),
            recovery_suggestions: vec!["Check that the document is valid JSON".to_string()],
            occurred_at: Utc::now(),
            source: Some(anyhow::anyhow!(e)),
        }
    }
}

/// Failure reported by a natural-language translator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("translator is not configured: {0}")]
    NotConfigured(String),
    #[error("translator failed: {0}")]
    Failed(String),
    #[error("translator returned an invalid document: {0}")]
    InvalidDocument(String),
}

/// Typed failure of one pipeline stage. Later stages never run once one of
/// these is returned.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Translation(#[from] TranslationError),
    #[error("workflow document rejected: {}", .reasons.join("; "))]
    Document { reasons: Vec<String> },
    #[error("generated code rejected: {}", .reasons.join("; "))]
    Generation { reasons: Vec<String> },
    #[error("missing modules: {}", .modules.join(", "))]
    DependencyMissing { modules: Vec<String> },
    #[error("dependency probe failed: {0}")]
    DependencyProbe(AppError),
    #[error("storage failure: {0}")]
    Storage(#[from] AppError),
}

impl PipelineError {
    /// Stage at which the pipeline halted.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Translation(_) => PipelineStage::Translate,
            PipelineError::Document { .. } => PipelineStage::Generate,
            PipelineError::Generation { .. } => PipelineStage::Validate,
            PipelineError::DependencyMissing { .. } | PipelineError::DependencyProbe(_) => {
                PipelineStage::Dependencies
            }
            PipelineError::Storage(_) => PipelineStage::Persist,
        }
    }

    /// Human-readable reasons, one per line of CLI output.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            PipelineError::Document { reasons } | PipelineError::Generation { reasons } => {
                reasons.clone()
            }
            PipelineError::DependencyMissing { modules } => modules
                .iter()
                .map(|module| format!("module '{}' is not importable", module))
                .collect(),
            other => vec![other.to_string()],
        }
    }
}

pub trait ErrorReporter {
    fn report_error(&self, error: &AppError);
    fn report_pipeline_error(&self, error: &PipelineError);
}

pub struct DefaultErrorReporter;

impl DefaultErrorReporter {
    pub fn new() -> Self {
        DefaultErrorReporter
    }
}

impl Default for DefaultErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorReporter for DefaultErrorReporter {
    fn report_error(&self, error: &AppError) {
        eprintln!("[ERROR] {}: {}", error.code, error.message);
        let mut context: Vec<_> = error.context.iter().collect();
        context.sort();
        for (key, value) in context {
            eprintln!("  {}: {}", key, value);
        }
        for suggestion in &error.recovery_suggestions {
            eprintln!("  Hint: {}", suggestion);
        }
        if let Some(ref source) = error.source {
            eprintln!("  Caused by: {}", source);
        }
    }

    fn report_pipeline_error(&self, error: &PipelineError) {
        eprintln!("[ERROR] {} stage failed", error.stage());
        for reason in error.reasons() {
            eprintln!("  - {}", reason);
        }
    }
}
