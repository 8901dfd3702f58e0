//! Static checks run on a generated script before it is saved or executed.

pub mod rules;
pub mod syntax;

pub use rules::*;

use crate::core::codegen::{CodeGenerator, GeneratedScript};
use crate::core::document::WorkflowDocument;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use syntax::ScanOutput;

/// Severity of a validation issue. Only errors fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

impl IssueSeverity {
    fn rank(&self) -> u8 {
        match self {
            IssueSeverity::Error => 3,
            IssueSeverity::Warning => 2,
            IssueSeverity::Info => 1,
        }
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Error => write!(f, "error"),
            IssueSeverity::Warning => write!(f, "warning"),
            IssueSeverity::Info => write!(f, "info"),
        }
    }
}

/// Single finding emitted by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub code: String,
    pub severity: IssueSeverity,
    pub message: String,
    pub location: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        code: impl Into<String>,
        severity: IssueSeverity,
        message: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            location,
        }
    }

    pub fn error(code: &str, message: impl Into<String>, location: Option<String>) -> Self {
        Self::new(code, IssueSeverity::Error, message, location)
    }

    pub fn warning(code: &str, message: impl Into<String>, location: Option<String>) -> Self {
        Self::new(code, IssueSeverity::Warning, message, location)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

/// Outcome of validating one script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// True when no issue has error severity.
    pub fn passed(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|issue| issue.severity == IssueSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
    }

    /// Human-readable failure reasons, one per error.
    pub fn reasons(&self) -> Vec<String> {
        self.errors().map(|issue| issue.to_string()).collect()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

/// Everything a rule may inspect. The script is scanned once and shared.
pub struct ValidationInput<'a> {
    pub document: &'a WorkflowDocument,
    pub source: &'a str,
    pub scan: ScanOutput,
    /// Modules the script may import for this document.
    pub allowed_modules: BTreeSet<String>,
}

impl<'a> ValidationInput<'a> {
    pub fn new(document: &'a WorkflowDocument, source: &'a str) -> Self {
        Self {
            document,
            source,
            scan: syntax::scan(source),
            allowed_modules: CodeGenerator::new().modules_for(document),
        }
    }
}

/// Trait implemented by validation rules.
pub trait ValidationRule: Send + Sync {
    fn check(&self, input: &ValidationInput<'_>) -> Vec<ValidationIssue>;
}

/// Registry running every built-in rule against a script.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: built_in_rules(),
        }
    }

    /// Add a rule on top of the built-in set.
    pub fn with_rule(mut self, rule: Box<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Validate a freshly generated script.
    pub fn validate(&self, document: &WorkflowDocument, script: &GeneratedScript) -> ValidationReport {
        self.validate_source(document, &script.source)
    }

    /// Validate script text, e.g. one loaded back from the store. Issues are
    /// ordered by severity, then by code; rule order is kept within a code.
    pub fn validate_source(&self, document: &WorkflowDocument, source: &str) -> ValidationReport {
        let input = ValidationInput::new(document, source);
        let mut issues = Vec::new();
        for rule in &self.rules {
            issues.extend(rule.check(&input));
        }
        issues.sort_by(|a, b| {
            b.severity
                .rank()
                .cmp(&a.severity.rank())
                .then_with(|| a.code.cmp(&b.code))
        });
        ValidationReport { issues }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
