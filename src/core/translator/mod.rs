//! Natural-language translation seam. The core only consumes the document a
//! translator returns; how it is produced is up to the implementation.

use crate::core::config::TranslatorConfig;
use crate::core::document::WorkflowDocument;
use crate::core::error::TranslationError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[async_trait]
pub trait WorkflowTranslator: Send + Sync {
    async fn translate(&self, description: &str) -> Result<WorkflowDocument, TranslationError>;
}

/// Pipes the description to an external command on stdin and parses the JSON
/// document it prints on stdout.
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTranslator {
    pub fn new(command: &str, timeout: Duration) -> Result<Self, TranslationError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| TranslationError::NotConfigured("translator command is empty".into()))?;
        Ok(Self {
            program,
            args: parts.collect(),
            timeout,
        })
    }

    pub fn from_config(config: &TranslatorConfig) -> Result<Self, TranslationError> {
        let command = config.command.as_deref().ok_or_else(|| {
            TranslationError::NotConfigured(
                "set translator.command in wizflow.toml or WIZFLOW_TRANSLATOR_COMMAND".into(),
            )
        })?;
        Self::new(command, Duration::from_secs(config.timeout_seconds))
    }

    async fn invoke(&self, description: &str) -> Result<String, TranslationError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                TranslationError::Failed(format!("failed to start '{}': {}", self.program, err))
            })?;

        // The write and the read run together under one deadline; a translator
        // that never reads stdin must not stall the write.
        let stdin = child.stdin.take();
        let send = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(description.as_bytes()).await {
                Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };
        let exchange = async move { tokio::join!(send, child.wait_with_output()) };

        let (sent, output) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                TranslationError::Failed(format!(
                    "translator timed out after {}",
                    humantime::format_duration(self.timeout)
                ))
            })?;
        let output = output.map_err(|err| TranslationError::Failed(err.to_string()))?;
        sent.map_err(|err| TranslationError::Failed(format!("failed to send description: {}", err)))?;

        if !output.status.success() {
            return Err(TranslationError::Failed(format!(
                "translator exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl WorkflowTranslator for CommandTranslator {
    async fn translate(&self, description: &str) -> Result<WorkflowDocument, TranslationError> {
        tracing::info!(program = %self.program, "translating description");
        let raw = self.invoke(description).await?;
        parse_translation(&raw)
    }
}

/// Parse translator output. Language models often wrap JSON in prose or code
/// fences, so the outermost object is extracted first.
pub fn parse_translation(raw: &str) -> Result<WorkflowDocument, TranslationError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => {
            return Err(TranslationError::InvalidDocument(
                "output contains no JSON object".into(),
            ))
        }
    };
    // Shape checks run later so a free-form name can still be slugified.
    serde_json::from_str(json).map_err(|err| TranslationError::InvalidDocument(err.to_string()))
}
