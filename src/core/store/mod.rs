#![allow(clippy::result_large_err)]

//! Saved workflows: `<name>.json` documents and `<name>.py` scripts side by
//! side in one directory.

use crate::core::codegen::GeneratedScript;
use crate::core::document::{check_name, WorkflowDocument};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const DOCUMENT_EXTENSION: &str = "json";
const SCRIPT_EXTENSION: &str = "py";

#[derive(Debug, Clone)]
pub struct WorkflowStore {
    root: PathBuf,
}

impl WorkflowStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, name: &str) -> Result<PathBuf, AppError> {
        self.entry_path(name, DOCUMENT_EXTENSION)
    }

    pub fn script_path(&self, name: &str) -> Result<PathBuf, AppError> {
        self.entry_path(name, SCRIPT_EXTENSION)
    }

    pub fn save_document(&self, document: &WorkflowDocument) -> Result<PathBuf, AppError> {
        let path = self.document_path(&document.name)?;
        let mut body = document.to_json_pretty()?;
        body.push('\n');
        self.write_atomic(&path, body.as_bytes())?;
        tracing::debug!(workflow = %document.name, path = %path.display(), "document saved");
        Ok(path)
    }

    pub fn load_document(&self, name: &str) -> Result<WorkflowDocument, AppError> {
        let path = self.document_path(name)?;
        if !path.is_file() {
            return Err(AppError::new(
                ErrorCategory::StorageError,
                format!("workflow '{}' is not saved", name),
            )
            .with_code("WIZ-STORE-002")
            .with_suggestion("run `wizflow list` to see saved workflows"));
        }
        WorkflowDocument::load_from_file(&path)
    }

    /// Write the script, replacing any previous version in one rename.
    pub fn save_script(&self, script: &GeneratedScript) -> Result<PathBuf, AppError> {
        let path = self.script_path(&script.workflow)?;
        self.write_atomic(&path, script.source.as_bytes())?;
        tracing::debug!(
            workflow = %script.workflow,
            digest = %script.digest(),
            path = %path.display(),
            "script saved"
        );
        Ok(path)
    }

    pub fn load_script(&self, name: &str) -> Result<String, AppError> {
        let path = self.script_path(name)?;
        fs::read_to_string(&path).map_err(|err| {
            AppError::new(
                ErrorCategory::StorageError,
                format!("failed to read {}: {}", path.display(), err),
            )
            .with_code("WIZ-STORE-003")
        })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.document_path(name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Names of saved documents, sorted. A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<String>, AppError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(AppError::new(
                    ErrorCategory::StorageError,
                    format!("failed to list {}: {}", self.root.display(), err),
                )
                .with_code("WIZ-STORE-003"))
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string))
            .filter(|name| check_name(name).is_ok())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Remove a saved workflow. Only called on explicit request.
    pub fn remove(&self, name: &str) -> Result<bool, AppError> {
        let mut removed = false;
        for path in [self.document_path(name)?, self.script_path(name)?] {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(AppError::new(
                        ErrorCategory::StorageError,
                        format!("failed to remove {}: {}", path.display(), err),
                    )
                    .with_code("WIZ-STORE-003"))
                }
            }
        }
        Ok(removed)
    }

    fn entry_path(&self, name: &str, extension: &str) -> Result<PathBuf, AppError> {
        check_name(name).map_err(|reason| {
            AppError::new(ErrorCategory::StorageError, reason).with_code("WIZ-STORE-001")
        })?;
        Ok(self.root.join(format!("{}.{}", name, extension)))
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), AppError> {
        let storage_error = |action: &str, err: &dyn std::fmt::Display| {
            AppError::new(
                ErrorCategory::StorageError,
                format!("failed to {} {}: {}", action, path.display(), err),
            )
            .with_code("WIZ-STORE-003")
        };

        fs::create_dir_all(&self.root).map_err(|err| storage_error("create directory for", &err))?;
        let mut temp = NamedTempFile::new_in(&self.root).map_err(|err| storage_error("stage", &err))?;
        temp.write_all(contents)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|err| storage_error("write", &err))?;
        temp.persist(path)
            .map_err(|err| storage_error("replace", &err.error))?;
        Ok(())
    }
}
