use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::SummaryError;
use crate::pipeline::types::{SummaryField, SummaryResult};

static JSON_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Parse a model reply into a summary.
///
/// Strict JSON first; otherwise the outermost `{...}` block (code fences,
/// leading prose). Missing keys become empty strings, values are trimmed,
/// string arrays become dash bullets.
pub fn parse_summary(reply: &str) -> Result<SummaryResult, SummaryError> {
    let value: Value = match serde_json::from_str(reply.trim()) {
        Ok(v) => v,
        Err(strict_err) => {
            let block = JSON_BLOCK_RE
                .find(reply)
                .ok_or_else(|| SummaryError::JsonParsing(strict_err.to_string()))?;
            serde_json::from_str(block.as_str())
                .map_err(|e| SummaryError::JsonParsing(e.to_string()))?
        }
    };

    let object = value
        .as_object()
        .ok_or_else(|| SummaryError::MalformedResponse("reply is not a JSON object".into()))?;

    let mut summary = SummaryResult::default();
    for field in SummaryField::ALL {
        let text = match object.get(field.key()) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Array(items)) => items
                .iter()
                .map(value_text)
                .filter(|s| !s.is_empty())
                .map(|s| format!("- {s}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Some(other) => value_text(other),
        };
        summary.set(field, text);
    }
    Ok(summary)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
