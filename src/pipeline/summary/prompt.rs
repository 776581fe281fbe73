//! Instructions and response contract for the summary model.

use serde_json::json;

use crate::pipeline::types::SummaryField;

/// Longest language label passed into the instructions.
const MAX_LANGUAGE_LEN: usize = 40;

/// System instructions for one summary call.
pub fn build_instructions(language: &str) -> String {
    let keys = SummaryField::ALL
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are a medical report summarizer for the public. \
         Write all output in {language}. \
         Return ONLY a JSON object with the string keys: {keys}. \
         Use clear, simple language a non-medical reader understands. Be factual. \
         Do not invent findings. No treatment advice. \
         Do not include names, dates, or identifiers. \
         Leave placeholders such as [REDACTED], [AGE] or [SEX] exactly as written. \
         In findings and conclusion put each point on its own line starting with \"- \". \
         Use concern only for findings that need prompt follow-up; otherwise leave it empty.",
        language = clean_language(language),
    )
}

/// Strict JSON-schema response format requiring exactly the five string keys.
pub fn summary_response_format() -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    for field in SummaryField::ALL {
        properties.insert(field.key().to_string(), json!({ "type": "string" }));
    }
    let required: Vec<&str> = SummaryField::ALL.iter().map(|f| f.key()).collect();

    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "ReportSummary",
            "strict": true,
            "schema": {
                "type": "object",
                "additionalProperties": false,
                "properties": properties,
                "required": required,
            }
        }
    })
}

/// Keep a language label to letters, spaces and hyphens; default to English.
fn clean_language(language: &str) -> String {
    let cleaned: String = language
        .chars()
        .filter(|c| c.is_alphabetic() || *c == ' ' || *c == '-')
        .take(MAX_LANGUAGE_LEN)
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "English".to_string()
    } else {
        cleaned.to_string()
    }
}
