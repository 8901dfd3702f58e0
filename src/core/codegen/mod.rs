//! Code generation: a pure mapping from a workflow document to Python source.
//!
//! The generator never fails. Unknown action types become commented no-op
//! blocks and missing required parameters are emitted as `None`; rejecting
//! either is the validator's job.

pub mod literal;
pub mod templates;

use crate::core::document::{ActionStep, WorkflowDocument};
use literal::{comment_text, py_argument, py_literal, py_str};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use templates::{action_template, trigger_template, ActionTemplate, ACTION_TEMPLATE_ORDER};

/// Modules every generated script imports.
pub const BASE_MODULES: [&str; 4] = ["json", "os", "re", "sys"];

const INDENT: &str = "    ";

const PRELUDE: &str = r#"_PLACEHOLDER = re.compile(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}")


def _lookup(variables, path):
    value = variables
    for part in path.split("."):
        if isinstance(value, dict) and part in value:
            value = value[part]
        else:
            return ""
    return value


def _render(template, variables):
    whole = _PLACEHOLDER.fullmatch(template)
    if whole:
        return _lookup(variables, whole.group(1))
    return _PLACEHOLDER.sub(lambda match: str(_lookup(variables, match.group(1))), template)


def _record(action, **fields):
    target = os.environ.get("WIZFLOW_RECORD_FILE")
    if not target:
        return False
    entry = {"action": action}
    entry.update(fields)
    with open(target, "a", encoding="utf-8") as handle:
        handle.write(json.dumps(entry, sort_keys=True, default=str) + "\n")
    return True
"#;

const MAIN: &str = r#"def main():
    variables = {}
    payload = os.environ.get("WIZFLOW_TRIGGER_PAYLOAD")
    if payload:
        variables["trigger"] = json.loads(payload)
{trigger_setup}    print(f"starting workflow {WORKFLOW_NAME}")
    try:
        run_workflow(variables)
    except Exception as exc:
        print(f"workflow {WORKFLOW_NAME} failed: {exc}", file=sys.stderr)
        return 1
    print(f"workflow {WORKFLOW_NAME} completed")
    return 0


if __name__ == "__main__":
    sys.exit(main())
"#;

/// Source text derived from one workflow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub workflow: String,
    pub source: String,
    /// Every module the script imports, sorted and deduplicated.
    pub modules: BTreeSet<String>,
}

impl GeneratedScript {
    /// Hex SHA-256 of the source, used to tag log events.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.source.as_bytes()))
    }
}

/// Stateless code generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeGenerator;

impl CodeGenerator {
    pub fn new() -> Self {
        CodeGenerator
    }

    /// Generate the script for a document. Identical input yields identical output.
    pub fn generate(&self, document: &WorkflowDocument) -> GeneratedScript {
        let modules = self.modules_for(document);
        let used = used_templates(document);

        let mut source = String::new();
        source.push_str("#!/usr/bin/env python3\n");
        let _ = writeln!(
            source,
            "# Generated by wizflow from workflow {}. Regenerate instead of editing.",
            comment_text(&document.name)
        );
        if let Some(description) = document.description.as_deref() {
            let _ = writeln!(source, "# Description: {}", comment_text(description));
        }
        let _ = writeln!(source, "# Trigger: {}", document.trigger.kind);
        source.push('\n');

        for module in &modules {
            let _ = writeln!(source, "import {}", module);
        }
        source.push('\n');

        let _ = writeln!(source, "WORKFLOW_NAME = {}", py_str(&document.name));
        let _ = writeln!(source, "TRIGGER = {}", py_literal(&trigger_value(document)));
        source.push_str("\n\n");
        source.push_str(PRELUDE);

        for template in used {
            source.push_str("\n\n");
            source.push_str(template.definition);
        }

        source.push_str("\n\n");
        source.push_str(&self.run_function(document));
        source.push_str("\n\n");
        source.push_str(&main_function(document));

        GeneratedScript {
            workflow: document.name.clone(),
            source,
            modules,
        }
    }

    /// Modules the generated script will import for this document.
    pub fn modules_for(&self, document: &WorkflowDocument) -> BTreeSet<String> {
        let mut modules: BTreeSet<String> = BASE_MODULES.iter().map(|m| m.to_string()).collect();
        for template in used_templates(document) {
            modules.extend(template.modules.iter().map(|m| m.to_string()));
        }
        modules.extend(
            trigger_template(document.trigger.kind)
                .modules
                .iter()
                .map(|m| m.to_string()),
        );
        modules
    }

    fn run_function(&self, document: &WorkflowDocument) -> String {
        let mut out = String::from("def run_workflow(variables):\n");
        if document.actions.is_empty() {
            out.push_str(INDENT);
            out.push_str("pass\n");
            return out;
        }
        for (index, action) in document.actions.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&action_block(index + 1, action));
        }
        out
    }
}

fn action_block(position: usize, action: &ActionStep) -> String {
    let mut out = String::new();
    let kind = comment_text(action.kind.as_str());
    match action.description.as_deref() {
        Some(description) => {
            let _ = writeln!(
                out,
                "{}# Action {} ({}): {}",
                INDENT,
                position,
                kind,
                comment_text(description)
            );
        }
        None => {
            let _ = writeln!(out, "{}# Action {} ({})", INDENT, position, kind);
        }
    }

    match action_template(&action.kind) {
        Some(template) => {
            let _ = writeln!(
                out,
                "{}print({})",
                INDENT,
                py_str(&format!("running action {}: {}", position, action.kind))
            );
            let _ = writeln!(out, "{}{}", INDENT, call_site(template, action));
        }
        None => {
            let _ = writeln!(
                out,
                "{}# Unrecognized action type; no template exists, so this step does nothing.",
                INDENT
            );
            let _ = writeln!(
                out,
                "{}print({})",
                INDENT,
                py_str(&format!(
                    "skipping unrecognized action {}: {}",
                    position, action.kind
                ))
            );
        }
    }
    out
}

fn call_site(template: &ActionTemplate, action: &ActionStep) -> String {
    let mut args = vec!["variables".to_string()];
    for name in template.required {
        let value = template
            .lookup(&action.parameters, name)
            .cloned()
            .unwrap_or(Value::Null);
        args.push(format!("{}={}", name, py_argument(&value)));
    }
    for (name, default) in template.optional {
        let value = template
            .lookup(&action.parameters, name)
            .cloned()
            .unwrap_or_else(|| default.to_value());
        args.push(format!("{}={}", name, py_argument(&value)));
    }
    format!("{}({})", template.helper, args.join(", "))
}

fn main_function(document: &WorkflowDocument) -> String {
    let mut setup = String::new();
    for line in trigger_template(document.trigger.kind).setup {
        let _ = writeln!(setup, "{}{}", INDENT, line);
    }
    MAIN.replace("{trigger_setup}", &setup)
}

fn trigger_value(document: &WorkflowDocument) -> Value {
    let mut map = Map::new();
    map.insert(
        "type".to_string(),
        Value::String(document.trigger.kind.to_string()),
    );
    for (key, value) in &document.trigger.params {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}

/// Templates used by a document, in emission order.
pub fn used_templates(document: &WorkflowDocument) -> Vec<&'static ActionTemplate> {
    ACTION_TEMPLATE_ORDER
        .iter()
        .copied()
        .filter(|template| {
            document.actions.iter().any(|action| {
                action_template(&action.kind).is_some_and(|used| std::ptr::eq(used, *template))
            })
        })
        .collect()
}
