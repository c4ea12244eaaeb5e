//! Normalizes untrusted LLM output into a bounded list of issues.
//!
//! Nothing here returns an error: anything unusable is dropped, either one
//! field (replaced by a default) or one entry (skipped), and a response that
//! is not shaped like `{"issues": [...]}` yields an empty batch.

use serde_json::Value;

use super::models::{IssueBatch, IssueCandidate};

/// Key holding the issue list in the model's JSON object.
pub const ISSUES_KEY: &str = "issues";
/// Entries beyond this many are ignored.
pub const MAX_ISSUES: usize = 20;
pub const MAX_TITLE_CHARS: usize = 200;
pub const ELLIPSIS: &str = "...";
pub const DEFAULT_BODY: &str = "No description provided";
pub const DEFAULT_PRIORITY: i64 = 3;
pub const MIN_PRIORITY: i64 = 1;
pub const MAX_PRIORITY: i64 = 5;

/// Validate a whole parsed response.
pub fn validate_issues_response(data: &Value) -> IssueBatch {
    let Some(object) = data.as_object() else {
        tracing::warn!(kind = value_kind(data), "LLM response is not a JSON object");
        return Vec::new();
    };
    let Some(entries) = object.get(ISSUES_KEY).and_then(Value::as_array) else {
        tracing::warn!(
            keys = ?object.keys().collect::<Vec<_>>(),
            "LLM response has no '{}' array",
            ISSUES_KEY
        );
        return Vec::new();
    };
    if entries.len() > MAX_ISSUES {
        tracing::info!(
            count = entries.len(),
            limit = MAX_ISSUES,
            "Too many issues in LLM response, truncating"
        );
    }

    let considered = &entries[..entries.len().min(MAX_ISSUES)];
    let validated: IssueBatch = considered
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| validate_issue(entry, index))
        .collect();

    tracing::debug!(
        valid = validated.len(),
        total = considered.len(),
        "Validated LLM issues"
    );
    validated
}

/// Validate a single entry. `None` means the entry is discarded.
pub fn validate_issue(entry: &Value, index: usize) -> Option<IssueCandidate> {
    let Some(fields) = entry.as_object() else {
        tracing::debug!(index, kind = value_kind(entry), "Skipping non-object issue");
        return None;
    };

    let title = match fields.get("title").and_then(Value::as_str).map(str::trim) {
        Some(title) if !title.is_empty() => truncate_title(title),
        _ => {
            tracing::debug!(index, "Skipping issue without a usable title");
            return None;
        }
    };

    Some(IssueCandidate {
        title,
        body: normalize_body(fields.get("body")),
        labels: normalize_labels(fields.get("labels")),
        priority: normalize_priority(fields.get("priority")),
    })
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let keep = MAX_TITLE_CHARS - ELLIPSIS.chars().count();
    let mut truncated: String = title.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

fn normalize_body(body: Option<&Value>) -> String {
    match body {
        Some(Value::String(text)) => text.clone(),
        None | Some(Value::Null) => DEFAULT_BODY.to_string(),
        Some(other) => other.to_string(),
    }
}

fn normalize_labels(labels: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = labels else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .filter(|label| !label.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_priority(priority: Option<&Value>) -> u8 {
    let raw = match priority {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(saturating_trunc)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    // Clamped into 1..=5, so the narrowing cast cannot truncate.
    raw.unwrap_or(DEFAULT_PRIORITY)
        .clamp(MIN_PRIORITY, MAX_PRIORITY) as u8
}

fn saturating_trunc(value: f64) -> i64 {
    // `as` saturates at the i64 bounds and truncates toward zero.
    value.trunc() as i64
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
