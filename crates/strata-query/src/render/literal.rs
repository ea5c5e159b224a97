//! Literal and identifier rendering.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Names that can appear unquoted after `.` or `:`
static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// ISO-8601 date-time strings, rendered as temporal values
static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(:\d{2}(\.\d{1,9})?)?(Z|[+-]\d{2}:\d{2})?$").unwrap()
});

/// Quote a name with backticks unless it is a plain identifier.
pub fn name(raw: &str) -> String {
    if IDENT_RE.is_match(raw) {
        raw.to_string()
    } else {
        quoted(raw)
    }
}

/// Always backtick-quote; used for labels and relation types.
pub fn quoted(raw: &str) -> String {
    format!("`{}`", raw.replace('`', "``"))
}

/// `base.key`, quoting the key when needed.
pub fn member(base: &str, key: &str) -> String {
    format!("{}.{}", base, name(key))
}

/// Render a scalar literal. Date-time strings become `datetime("...")`.
pub fn literal(value: &Value) -> String {
    match value {
        Value::String(s) if DATETIME_RE.is_match(s) => format!("datetime({value})"),
        Value::Array(items) => list(items),
        other => other.to_string(),
    }
}

/// Render a list literal: `["a","b"]`.
pub fn list(items: &[Value]) -> String {
    let rendered: Vec<String> = items.iter().map(literal).collect();
    format!("[{}]", rendered.join(","))
}

/// Render a string literal with JSON escaping.
pub fn string(raw: &str) -> String {
    Value::String(raw.to_string()).to_string()
}
