#![allow(clippy::result_large_err)] // Document APIs return AppError to preserve structured load context without boxing.

//! Workflow document model: a trigger plus an ordered list of typed actions.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

const MAX_NAME_LEN: usize = 100;

/// Ordered parameter mapping. Order follows the document so generated code is
/// stable for identical input.
pub type Parameters = IndexMap<String, Value>;

/// Root document describing one automation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkflowDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub actions: Vec<ActionStep>,
}

/// Declared start condition. The core records it; it never listens for it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub kind: TriggerType,
    #[serde(flatten)]
    pub params: Parameters,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            kind: TriggerType::Manual,
            params: Parameters::new(),
        }
    }
}

impl Trigger {
    pub fn manual() -> Self {
        Self::default()
    }
}

/// Trigger type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    Manual,
    Schedule,
    Email,
    File,
    Webhook,
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TriggerType::Manual => "manual",
            TriggerType::Schedule => "schedule",
            TriggerType::Email => "email",
            TriggerType::File => "file",
            TriggerType::Webhook => "webhook",
        };
        write!(f, "{}", label)
    }
}

/// One typed, parameterized unit of work.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ActionStep {
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(default, alias = "config")]
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActionStep {
    pub fn new(kind: ActionType) -> Self {
        Self {
            kind,
            parameters: Parameters::new(),
            description: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Action type. Closed set of known kinds plus a catch-all that keeps the
/// raw name; unknown kinds generate a no-op block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Email,
    Messaging,
    Web,
    Scrape,
    File,
    Ai,
    Data,
    Custom(String),
}

impl ActionType {
    pub fn is_known(&self) -> bool {
        !matches!(self, ActionType::Custom(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionType::Email => "email",
            ActionType::Messaging => "messaging",
            ActionType::Web => "web",
            ActionType::Scrape => "scrape",
            ActionType::File => "file",
            ActionType::Ai => "ai",
            ActionType::Data => "data",
            ActionType::Custom(raw) => raw.as_str(),
        }
    }
}

impl From<String> for ActionType {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "email" | "send_email" => ActionType::Email,
            "messaging" | "send_whatsapp" | "send_sms" | "whatsapp" | "sms" => {
                ActionType::Messaging
            }
            "web" | "api_call" | "http" => ActionType::Web,
            "scrape" | "web_scrape" => ActionType::Scrape,
            "file" | "file_process" => ActionType::File,
            "ai" | "summarize" => ActionType::Ai,
            "data" | "log_message" | "transform" => ActionType::Data,
            _ => ActionType::Custom(raw),
        }
    }
}

impl From<&str> for ActionType {
    fn from(raw: &str) -> Self {
        ActionType::from(raw.to_string())
    }
}

impl From<ActionType> for String {
    fn from(kind: ActionType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl WorkflowDocument {
    pub fn new(name: impl Into<String>, trigger: Trigger, actions: Vec<ActionStep>) -> Self {
        Self {
            name: name.into(),
            description: None,
            trigger,
            actions,
        }
    }

    /// Parse a document from JSON text and check its shape.
    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        let doc: WorkflowDocument = serde_json::from_str(text).map_err(|err| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("failed to parse workflow document: {}", err),
            )
            .with_code("WIZ-DOC-001")
        })?;
        let issues = doc.structural_issues();
        if !issues.is_empty() {
            return Err(
                AppError::new(ErrorCategory::ValidationError, issues.join("; "))
                    .with_code("WIZ-DOC-002"),
            );
        }
        Ok(doc)
    }

    /// Load and shape-check a document from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to read {}: {}", path.display(), err),
            )
        })?;
        Self::from_json_str(&text).map_err(|mut err| {
            err.add_context("path", &path.display().to_string());
            err
        })
    }

    /// Pretty JSON used for persistence.
    pub fn to_json_pretty(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Shape problems that make the document unusable as a persistence unit.
    /// Parameter presence is checked later by the validator.
    pub fn structural_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if let Err(reason) = check_name(&self.name) {
            issues.push(reason);
        }
        for (index, action) in self.actions.iter().enumerate() {
            if action.kind.as_str().trim().is_empty() {
                issues.push(format!("action {} has an empty type", index + 1));
            }
        }
        issues
    }

    /// Whether at least one action maps to a known template.
    pub fn has_known_action(&self) -> bool {
        self.actions.iter().any(|action| action.kind.is_known())
    }
}

/// Check that a workflow name is usable as a filename stem.
pub fn check_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("workflow name must not be empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!(
            "workflow name must be at most {} characters",
            MAX_NAME_LEN
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(format!(
            "workflow name '{}' contains unsupported character {:?}",
            name, bad
        ));
    }
    Ok(())
}

/// Turn a free-form title into a legal workflow name.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = false;
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.truncate(MAX_NAME_LEN);
    if slug.is_empty() {
        "workflow".to_string()
    } else {
        slug
    }
}
