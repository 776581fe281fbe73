//! Small text helpers shared by the pipeline stages.

use std::sync::LazyLock;

use regex::Regex;

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>\n]{1,200}>").expect("valid regex"));
static INLINE_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static ANY_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalize report text for regex scanning: unify line endings and dashes,
/// collapse runs of spaces, drop trailing spaces on each line.
pub fn normalize_report_text(text: &str) -> String {
    let unified = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{00A0}', " ");
    let collapsed = INLINE_WS_RE.replace_all(&unified, " ");
    collapsed
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Remove HTML-looking tags that OCR or upstream editors left in the text.
pub fn strip_html_tags(text: &str) -> String {
    HTML_TAG_RE.replace_all(text, " ").into_owned()
}

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    ANY_WS_RE.replace_all(text, " ").trim().to_string()
}

/// Split text into sentences on `.`, `!` or `?` followed by whitespace.
/// Decimal points ("1.2 cm") never split because no space follows them.
pub fn split_sentences(text: &str) -> Vec<String> {
    let flat = collapse_whitespace(text);
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = flat.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            let s = current.trim();
            if !s.is_empty() {
                sentences.push(s.to_string());
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Comparison key for sentences: lowercase alphanumerics separated by single spaces.
pub fn normalize_sentence_key(sentence: &str) -> String {
    sentence
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape text for safe inclusion in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip markup and decode the entities `escape_html` produces.
pub fn html_to_text(html: &str) -> String {
    let stripped = strip_html_tags(html);
    let decoded = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    collapse_whitespace(&decoded)
}

/// Count whitespace-separated tokens that contain at least one alphanumeric.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

/// Count sentence terminators, treating a run like "?!" as one.
pub fn sentence_count(text: &str) -> usize {
    let mut count = 0;
    let mut in_run = false;
    for c in text.chars() {
        if matches!(c, '.' | '!' | '?') {
            if !in_run {
                count += 1;
            }
            in_run = true;
        } else {
            in_run = false;
        }
    }
    count
}
