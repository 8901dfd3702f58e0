//! Conversion of document values into Python source literals.
//!
//! Every value that reaches generated code passes through one of these
//! functions, so no parameter text is ever spliced into the script raw.

use regex::Regex;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::OnceLock;

const COMMENT_MAX_CHARS: usize = 200;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// Quote a string as a double-quoted Python literal.
pub fn py_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if is_unicode_line_break(c) => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn is_unicode_line_break(c: char) -> bool {
    matches!(c, '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// Python literal for a value, with strings kept verbatim.
pub fn py_literal(value: &Value) -> String {
    render(value, false)
}

/// Python expression for an action argument. Strings that contain
/// `{{name}}` placeholders become a runtime `_render` call so earlier action
/// results can flow into later actions.
pub fn py_argument(value: &Value) -> String {
    render(value, true)
}

/// Whether a string carries at least one runtime placeholder.
pub fn is_template(text: &str) -> bool {
    placeholder_regex().is_match(text)
}

fn render(value: &Value, templates: bool) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => {
            if templates && is_template(text) {
                format!("_render({}, variables)", py_str(text))
            } else {
                py_str(text)
            }
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(|item| render(item, templates)).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(key, item)| format!("{}: {}", py_str(key), render(item, templates)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

/// Collapse free text into a single safe comment line.
pub fn comment_text(text: &str) -> String {
    let flattened: String = text
        .chars()
        .map(|c| {
            if c.is_control() || is_unicode_line_break(c) {
                ' '
            } else {
                c
            }
        })
        .collect();
    let trimmed = flattened.trim();
    if trimmed.chars().count() > COMMENT_MAX_CHARS {
        let mut cut: String = trimmed.chars().take(COMMENT_MAX_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        trimmed.to_string()
    }
}
