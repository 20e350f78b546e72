//! Lenient extraction of structured fields from model replies
//!
//! Models wrap JSON in code fences, add prose around it, or emit almost-JSON.
//! [`extract_json`] finds the object if there is one; the `*_field` helpers pull
//! single fields out with a regex when there isn't.

use regex::Regex;
use serde_json::Value;

/// Drop a surrounding ```` ```json ```` fence if present
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // skip the info string (`json`, `JSON`, ...)
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse the reply as a JSON object, falling back to the outermost `{...}` span
pub fn extract_json(text: &str) -> Option<Value> {
    let body = strip_code_fence(text);

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(body) {
        return Some(value);
    }

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&body[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// `"field": "value"` anywhere in the text
pub fn string_field(text: &str, field: &str) -> Option<String> {
    let pattern = format!(r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)""#, regex::escape(field));
    let re = Regex::new(&pattern).ok()?;
    let raw = re.captures(text)?.get(1)?.as_str();

    // reuse the JSON string decoder for escapes
    Some(serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string()))
}

/// `"field": true|false` anywhere in the text
pub fn bool_field(text: &str, field: &str) -> Option<bool> {
    let pattern = format!(r#""{}"\s*:\s*(true|false)"#, regex::escape(field));
    let re = Regex::new(&pattern).ok()?;
    re.captures(text).map(|caps| &caps[1] == "true")
}

/// Boolean-ish JSON value: `true`, `"false"`, `0`, ...
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

/// String value of `obj[key]`, empty when absent
pub fn str_of(obj: &Value, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
