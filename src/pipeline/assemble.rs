//! Final record assembly: dedup, list rendering, sentinels and stats.

use std::sync::LazyLock;

use regex::Regex;

use super::annotate::{count_highlights, Annotator};
use super::text::{escape_html, normalize_sentence_key, sentence_count, split_sentences, word_count};
use super::types::{
    ReportMetadata, ReportStats, StructuredReport, SummaryField, SummaryResult, SummarySource,
};

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-•*]|\d+[.)])\s+").expect("valid regex"));

/// Everything the assembler needs besides the annotator.
#[derive(Debug, Clone)]
pub struct ReportParts<'a> {
    pub metadata: ReportMetadata,
    /// Plain-text, simplified narrative fields.
    pub summary: SummaryResult,
    /// Normalized input text, used for word and sentence counts.
    pub raw_text: &'a str,
    pub language: &'a str,
    pub comparison: String,
    pub oral_contrast: String,
    pub source: SummarySource,
}

/// Render the narrative fields and build the final record.
pub fn assemble(annotator: &Annotator, parts: ReportParts<'_>) -> StructuredReport {
    let mut seen = Vec::new();
    let conclusion_items = dedup_items(list_items(&parts.summary.conclusion), &mut seen);
    let findings_items = dedup_items(list_items(&parts.summary.findings), &mut seen);

    let findings = render_list(annotator, &findings_items, SummaryField::Findings);
    let conclusion = render_list(annotator, &conclusion_items, SummaryField::Conclusion);

    let (findings_pos, findings_neg) = count_highlights(&findings);
    let (conclusion_pos, conclusion_neg) = count_highlights(&conclusion);

    let concern = if parts.summary.concern.trim().is_empty() {
        String::new()
    } else {
        format!("<p>{}</p>", annotator.annotate(&parts.summary.concern))
    };

    StructuredReport {
        study_date: parts.metadata.study_date(),
        reason: render_paragraph(annotator, &parts.summary.reason, SummaryField::Reason),
        technique: render_paragraph(annotator, &parts.summary.technique, SummaryField::Technique),
        findings,
        conclusion,
        concern,
        comparison: parts.comparison,
        oral_contrast: parts.oral_contrast,
        stats: ReportStats {
            word_count: word_count(parts.raw_text),
            sentence_count: sentence_count(parts.raw_text),
            highlights_positive: findings_pos + conclusion_pos,
            highlights_negative: findings_neg + conclusion_neg,
        },
        language: parts.language.to_string(),
        summary_source: parts.source,
        metadata: parts.metadata,
    }
}

/// Dash or numbered lines become items, with unmarked lines continuing the
/// item above; otherwise one item per sentence.
fn list_items(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if !lines.iter().any(|l| BULLET_RE.is_match(l)) {
        return split_sentences(text);
    }

    let mut items: Vec<String> = Vec::new();
    for line in lines {
        let body = BULLET_RE.replace(line, "");
        let body = body.trim();
        match items.last_mut() {
            Some(item) if !BULLET_RE.is_match(line) => {
                item.push(' ');
                item.push_str(body);
            }
            _ if body.is_empty() => {}
            _ => items.push(body.to_string()),
        }
    }
    items
}

/// Drop every sentence whose key is already in `seen`, recording the rest.
/// Items left without sentences are dropped.
fn dedup_items(items: Vec<String>, seen: &mut Vec<String>) -> Vec<String> {
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        let mut sentences = Vec::new();
        for sentence in split_sentences(&item) {
            let key = normalize_sentence_key(&sentence);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            sentences.push(sentence);
        }
        if !sentences.is_empty() {
            kept.push(sentences.join(" "));
        }
    }
    kept
}

fn render_list(annotator: &Annotator, items: &[String], field: SummaryField) -> String {
    if items.is_empty() {
        return escape_html(field.sentinel());
    }
    let body: String = items
        .iter()
        .map(|item| format!("<li>{}</li>", annotator.annotate(item)))
        .collect();
    format!("<ul>{body}</ul>")
}

fn render_paragraph(annotator: &Annotator, text: &str, field: SummaryField) -> String {
    if text.trim().is_empty() {
        return escape_html(field.sentinel());
    }
    format!("<p>{}</p>", annotator.annotate_terms(text))
}
