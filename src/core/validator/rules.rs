use super::syntax::TokenKind;
use super::{ValidationInput, ValidationIssue, ValidationRule};
use crate::core::codegen::literal::is_template;
use crate::core::codegen::templates::{action_template, trigger_template};
use crate::core::codegen::used_templates;
use crate::core::document::Parameters;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use url::Url;

pub const MISSING_PARAMETER: &str = "WIZ-VAL-001";
pub const EMPTY_ACTIONS: &str = "WIZ-VAL-002";
pub const NO_RECOGNIZED_ACTIONS: &str = "WIZ-VAL-003";
pub const UNRECOGNIZED_ACTION: &str = "WIZ-VAL-004";
pub const SYNTAX_ERROR: &str = "WIZ-VAL-010";
pub const DYNAMIC_EVALUATION: &str = "WIZ-VAL-020";
pub const IMPORT_NOT_ALLOWED: &str = "WIZ-VAL-021";
pub const UNDECLARED_HOST: &str = "WIZ-VAL-030";
pub const WORKSPACE_ESCAPE: &str = "WIZ-VAL-040";

/// Names that must not appear as code outside string literals.
const DENIED_NAMES: &[&str] = &[
    "eval",
    "exec",
    "compile",
    "__import__",
    "globals",
    "locals",
    "vars",
    "getattr",
    "setattr",
    "delattr",
    "breakpoint",
    "input",
    "subprocess",
    "pickle",
    "marshal",
    "ctypes",
    "importlib",
    "shutil",
];

const DENIED_OS_ATTRS: &[&str] = &["system", "popen", "remove", "unlink"];
const DENIED_OS_PREFIXES: &[&str] = &["exec", "spawn"];

pub fn built_in_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(RequiredParametersRule),
        Box::new(EmptyActionsRule),
        Box::new(UnrecognizedActionsRule),
        Box::new(SyntaxRule),
        Box::new(DynamicEvaluationRule),
        Box::new(ImportAllowlistRule),
        Box::new(NetworkDestinationRule),
        Box::new(WorkspacePathRule),
    ]
}

fn action_location(index: usize) -> Option<String> {
    Some(format!("actions[{}]", index))
}

fn line_location(line: usize) -> Option<String> {
    Some(format!("line {}", line))
}

struct RequiredParametersRule;

impl ValidationRule for RequiredParametersRule {
    fn check(&self, input: &ValidationInput<'_>) -> Vec<ValidationIssue> {
        let mut out = Vec::new();
        for (index, action) in input.document.actions.iter().enumerate() {
            let Some(template) = action_template(&action.kind) else {
                continue;
            };
            for name in template.missing_required(&action.parameters) {
                out.push(ValidationIssue::error(
                    MISSING_PARAMETER,
                    format!(
                        "action {} ({}) is missing required parameter '{}'",
                        index + 1,
                        action.kind,
                        name
                    ),
                    action_location(index),
                ));
            }
        }

        let trigger = &input.document.trigger;
        for name in trigger_template(trigger.kind).missing_required(&trigger.params) {
            out.push(ValidationIssue::error(
                MISSING_PARAMETER,
                format!(
                    "{} trigger is missing required parameter '{}'",
                    trigger.kind, name
                ),
                Some("trigger".to_string()),
            ));
        }
        out
    }
}

struct EmptyActionsRule;

impl ValidationRule for EmptyActionsRule {
    fn check(&self, input: &ValidationInput<'_>) -> Vec<ValidationIssue> {
        if input.document.actions.is_empty() {
            vec![ValidationIssue::error(
                EMPTY_ACTIONS,
                "workflow has no actions",
                Some("actions".to_string()),
            )]
        } else {
            Vec::new()
        }
    }
}

struct UnrecognizedActionsRule;

impl ValidationRule for UnrecognizedActionsRule {
    fn check(&self, input: &ValidationInput<'_>) -> Vec<ValidationIssue> {
        let actions = &input.document.actions;
        if actions.is_empty() {
            return Vec::new();
        }
        if !input.document.has_known_action() {
            return vec![ValidationIssue::error(
                NO_RECOGNIZED_ACTIONS,
                "none of the workflow's action types is recognized, so the script would do nothing",
                Some("actions".to_string()),
            )];
        }
        actions
            .iter()
            .enumerate()
            .filter(|(_, action)| !action.kind.is_known())
            .map(|(index, action)| {
                ValidationIssue::warning(
                    UNRECOGNIZED_ACTION,
                    format!(
                        "action {} has unrecognized type '{}' and will be skipped",
                        index + 1,
                        action.kind
                    ),
                    action_location(index),
                )
            })
            .collect()
    }
}

struct SyntaxRule;

impl ValidationRule for SyntaxRule {
    fn check(&self, input: &ValidationInput<'_>) -> Vec<ValidationIssue> {
        input
            .scan
            .issues
            .iter()
            .map(|issue| {
                ValidationIssue::error(
                    SYNTAX_ERROR,
                    format!("syntax error: {}", issue.message),
                    line_location(issue.line),
                )
            })
            .collect()
    }
}

struct DynamicEvaluationRule;

impl ValidationRule for DynamicEvaluationRule {
    fn check(&self, input: &ValidationInput<'_>) -> Vec<ValidationIssue> {
        let tokens = &input.scan.tokens;
        let mut out = Vec::new();
        let mut in_from_os = false;

        for (index, token) in tokens.iter().enumerate() {
            if token.line_start {
                in_from_os = matches!(
                    (&token.kind, tokens.get(index + 1).map(|t| &t.kind)),
                    (TokenKind::Name(first), Some(TokenKind::Name(module)))
                        if first == "from" && module == "os"
                );
            }
            let TokenKind::Name(name) = &token.kind else {
                continue;
            };
            let after_dot = index > 0 && tokens[index - 1].kind == TokenKind::Op('.');

            if !after_dot && DENIED_NAMES.contains(&name.as_str()) {
                out.push(ValidationIssue::error(
                    DYNAMIC_EVALUATION,
                    format!("use of '{}' is not allowed in generated code", name),
                    line_location(token.line),
                ));
                continue;
            }

            let os_attribute = after_dot
                && index >= 2
                && tokens[index - 2].kind == TokenKind::Name("os".to_string())
                && !(index >= 3 && tokens[index - 3].kind == TokenKind::Op('.'));
            if (os_attribute || in_from_os) && is_denied_os_attr(name) {
                out.push(ValidationIssue::error(
                    DYNAMIC_EVALUATION,
                    format!("use of 'os.{}' is not allowed in generated code", name),
                    line_location(token.line),
                ));
            }
        }
        out
    }
}

fn is_denied_os_attr(name: &str) -> bool {
    DENIED_OS_ATTRS.contains(&name)
        || DENIED_OS_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

struct ImportAllowlistRule;

impl ValidationRule for ImportAllowlistRule {
    fn check(&self, input: &ValidationInput<'_>) -> Vec<ValidationIssue> {
        input
            .scan
            .imported_modules()
            .into_iter()
            .filter(|(module, _)| !input.allowed_modules.contains(module))
            .map(|(module, line)| {
                ValidationIssue::error(
                    IMPORT_NOT_ALLOWED,
                    format!("import of '{}' is not allowed for this workflow", module),
                    line_location(line),
                )
            })
            .collect()
    }
}

struct NetworkDestinationRule;

impl ValidationRule for NetworkDestinationRule {
    fn check(&self, input: &ValidationInput<'_>) -> Vec<ValidationIssue> {
        let blocks = ActionBlocks::locate(input.source);
        let shared = shared_hosts(input);
        let per_action: Vec<BTreeSet<String>> = input
            .document
            .actions
            .iter()
            .map(|action| {
                let mut hosts = BTreeSet::new();
                if let Some(template) = action_template(&action.kind) {
                    hosts.extend(template.hosts.iter().map(|host| host.to_ascii_lowercase()));
                }
                collect_param_hosts(&action.parameters, &mut hosts);
                hosts
            })
            .collect();
        let empty = BTreeSet::new();

        let mut reported = BTreeSet::new();
        let mut out = Vec::new();
        for token in &input.scan.tokens {
            let TokenKind::Str(body) = &token.kind else {
                continue;
            };
            let owner = blocks.owner(token.line);
            let declared = match owner {
                Some(index) => per_action.get(index).unwrap_or(&empty),
                None => &shared,
            };
            for host in url_hosts(body) {
                if declared.contains(&host) || !reported.insert((owner, host.clone())) {
                    continue;
                }
                let message = match owner {
                    Some(index) => format!(
                        "action {} contacts host '{}' not declared in its parameters",
                        index + 1,
                        host
                    ),
                    None => format!("script contacts undeclared host '{}'", host),
                };
                out.push(ValidationIssue::error(
                    UNDECLARED_HOST,
                    message,
                    line_location(token.line),
                ));
            }
        }
        out
    }
}

/// Hosts code outside the action blocks may name: the fixed endpoints of the
/// templates in use plus URLs in the trigger parameters.
fn shared_hosts(input: &ValidationInput<'_>) -> BTreeSet<String> {
    let mut hosts = BTreeSet::new();
    for template in used_templates(input.document) {
        hosts.extend(template.hosts.iter().map(|host| host.to_ascii_lowercase()));
    }
    collect_param_hosts(&input.document.trigger.params, &mut hosts);
    hosts
}

/// Line spans of the per-action blocks inside `run_workflow`.
struct ActionBlocks {
    /// `(first line, action index)` in source order.
    headers: Vec<(usize, usize)>,
    end: usize,
}

impl ActionBlocks {
    fn locate(source: &str) -> Self {
        let mut headers = Vec::new();
        let mut inside = false;
        let mut end = 0;
        for (offset, line) in source.lines().enumerate() {
            let number = offset + 1;
            if line.starts_with("def run_workflow(") {
                inside = true;
                continue;
            }
            if !inside {
                continue;
            }
            if !line.is_empty() && !line.starts_with(' ') && !line.starts_with('\t') {
                break;
            }
            end = number;
            let position = line
                .strip_prefix("    # Action ")
                .and_then(|rest| rest.split(' ').next())
                .and_then(|digits| digits.parse::<usize>().ok());
            if let Some(position) = position.filter(|position| *position > 0) {
                headers.push((number, position - 1));
            }
        }
        Self { headers, end }
    }

    /// Index of the action whose block contains `line`.
    fn owner(&self, line: usize) -> Option<usize> {
        if line > self.end {
            return None;
        }
        self.headers
            .iter()
            .rev()
            .find(|(start, _)| *start <= line)
            .map(|(_, index)| *index)
    }
}

fn collect_param_hosts(params: &Parameters, hosts: &mut BTreeSet<String>) {
    for value in params.values() {
        collect_value_hosts(value, hosts);
    }
}

fn collect_value_hosts(value: &Value, hosts: &mut BTreeSet<String>) {
    match value {
        Value::String(text) => hosts.extend(url_hosts(text)),
        Value::Array(items) => items
            .iter()
            .for_each(|item| collect_value_hosts(item, hosts)),
        Value::Object(map) => map
            .values()
            .for_each(|item| collect_value_hosts(item, hosts)),
        _ => {}
    }
}

fn url_regex() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:https?|wss?|ftp)://[^\s"'<>\\{}]+"#).expect("url regex is valid")
    })
}

/// Lowercased hosts of every URL found in a piece of text.
pub fn url_hosts(text: &str) -> Vec<String> {
    url_regex()
        .find_iter(text)
        .filter_map(|found| Url::parse(found.as_str()).ok())
        .filter_map(|url| url.host_str().map(|host| host.to_ascii_lowercase()))
        .collect()
}

struct WorkspacePathRule;

impl ValidationRule for WorkspacePathRule {
    fn check(&self, input: &ValidationInput<'_>) -> Vec<ValidationIssue> {
        let mut out = Vec::new();
        for (index, action) in input.document.actions.iter().enumerate() {
            let Some(template) = action_template(&action.kind) else {
                continue;
            };
            for name in template.path_params {
                if let Some(Value::String(path)) = template.lookup(&action.parameters, name) {
                    if let Err(reason) = check_workspace_path(path) {
                        out.push(ValidationIssue::error(
                            WORKSPACE_ESCAPE,
                            format!("action {} parameter '{}': {}", index + 1, name, reason),
                            action_location(index),
                        ));
                    }
                }
            }
        }

        let trigger = &input.document.trigger;
        let template = trigger_template(trigger.kind);
        for name in template.path_params {
            if let Some(Value::String(path)) = template.lookup(&trigger.params, name) {
                if let Err(reason) = check_workspace_path(path) {
                    out.push(ValidationIssue::error(
                        WORKSPACE_ESCAPE,
                        format!("trigger parameter '{}': {}", name, reason),
                        Some("trigger".to_string()),
                    ));
                }
            }
        }
        out
    }
}

/// Check that a path stays inside the workspace. For template paths only the
/// literal text before the first placeholder is checked; the rest is resolved
/// at run time and guarded by the script itself.
pub fn check_workspace_path(path: &str) -> Result<(), String> {
    let checked = match path.find("{{") {
        Some(start) if is_template(path) => &path[..start],
        _ => path,
    };
    if checked.starts_with('/') || checked.starts_with('\\') {
        return Err(format!("'{}' is an absolute path", path));
    }
    if checked.starts_with('~') {
        return Err(format!("'{}' refers to a home directory", path));
    }
    let mut chars = checked.chars();
    if let (Some(drive), Some(':')) = (chars.next(), chars.next()) {
        if drive.is_ascii_alphabetic() {
            return Err(format!("'{}' is an absolute path", path));
        }
    }

    let mut depth: i64 = 0;
    for component in checked.split(['/', '\\']) {
        match component {
            "" | "." => {}
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return Err(format!("'{}' escapes the workspace", path));
                }
            }
            _ => depth += 1,
        }
    }
    Ok(())
}
