//! Privacy scrubbing for text that leaves the process.
//!
//! `prepare_outbound` is the only way to build a [`RedactedText`], and the
//! summary provider accepts nothing else. Rules run in a fixed order; earlier
//! rules consume text before later ones see it.

use std::sync::LazyLock;

use regex::Regex;

use super::types::ReportMetadata;

/// Maximum outbound length (characters).
const MAX_OUTBOUND_LENGTH: usize = 50_000;

/// Placeholder for a removed identifier.
pub const REDACTED: &str = "[REDACTED]";
pub const DOB_PLACEHOLDER: &str = "[DOB]";
pub const AGE_PLACEHOLDER: &str = "[AGE]";
pub const SEX_PLACEHOLDER: &str = "[SEX]";
pub const AGE_SEX_PLACEHOLDER: &str = "[AGE/SEX]";

/// Text that has been through the redactor. Cannot be built any other way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedText(String);

impl RedactedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Identifying terms derived from one report's metadata. Never persisted or logged.
#[derive(Default, Clone)]
pub struct PhiTerms(Vec<String>);

impl PhiTerms {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Debug for PhiTerms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PhiTerms({} terms)", self.0.len())
    }
}

/// Pieces too generic to count as identifying.
const STOPWORDS: &[&str] = &[
    "and", "the", "of", "for", "in", "at", "on", "to", "a", "an", "dr", "mr", "mrs", "ms", "miss",
    "patient", "hospital", "hospitals", "clinic", "clinics", "centre", "center", "medical",
    "radiology", "imaging", "department", "dept", "diagnostic", "diagnostics", "health", "general",
    "university", "teaching", "referral", "national", "county", "district", "services", "unit",
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep",
    "sept", "oct", "nov", "dec",
];

/// Build the extra-term list for one report from its name, hospital and date.
///
/// Each full value is kept as a phrase, plus its individual tokens minus
/// stopwords, single characters and pure numbers.
pub fn phi_terms(meta: &ReportMetadata) -> PhiTerms {
    let mut terms: Vec<String> = Vec::new();
    let mut push = |term: &str| {
        let t = term.trim();
        if t.chars().count() < 2 || t.chars().all(|c| c.is_ascii_digit()) {
            return;
        }
        if !terms.iter().any(|existing| existing.eq_ignore_ascii_case(t)) {
            terms.push(t.to_string());
        }
    };

    for value in [&meta.name, &meta.hospital, &meta.date] {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        push(value);
        for token in value.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '’')) {
            let lower = token.to_lowercase();
            if STOPWORDS.contains(&lower.as_str()) {
                continue;
            }
            push(token);
        }
    }

    // Longest first so phrases win over their own tokens.
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    PhiTerms(terms)
}

static LABEL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:patient(?:'s)?(?:[ \t]+(?:name|id))?|name|mrn|id|acct|account(?:[ \t]+no\.?)?|gender|sex|age|dob|d\.o\.b\.?|date[ \t]+of[ \t]+birth)\b[ \t]*(?:[:#=]|[ \t]-[ \t]).*$",
    )
    .expect("valid regex")
});

static DOB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:dob|d\.o\.b\.?|date\s+of\s+birth|born(?:\s+on)?)\s*[:\-]?\s*(?:\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}|\d{1,2}\s+[a-z]{3,9}\s+\d{4})",
    )
    .expect("valid regex")
});

static AGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,3}[ \-]?(?:years?|yrs?)[ \-]old\b|\b\d{1,3}[ ]?y/?o\b|\b\d{1,3}[ ]?yrs?\b")
        .expect("valid regex")
});

static SEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:male|female)\b").expect("valid regex"));

static AGE_SEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,3}[ ]?/[ ]?[MFmf]\b|\b\d{1,3}[MF]\b").expect("valid regex")
});

/// Apply the redaction rules to `text`, including the caller's extra terms.
pub fn redact(text: &str, extra_terms: &PhiTerms) -> RedactedText {
    let mut out = LABEL_LINE_RE.replace_all(text, REDACTED).into_owned();
    out = DOB_RE.replace_all(&out, DOB_PLACEHOLDER).into_owned();
    out = AGE_RE.replace_all(&out, AGE_PLACEHOLDER).into_owned();
    out = SEX_RE.replace_all(&out, SEX_PLACEHOLDER).into_owned();
    out = AGE_SEX_RE.replace_all(&out, AGE_SEX_PLACEHOLDER).into_owned();

    for term in extra_terms.terms() {
        match term_regex(term) {
            Some(re) => out = re.replace_all(&out, REDACTED).into_owned(),
            None => {
                // Fall back to a plain case-insensitive scan.
                out = replace_case_insensitive(&out, term, REDACTED);
            }
        }
    }
    RedactedText(out)
}

/// Clean, redact and bound text destined for the summary provider.
pub fn prepare_outbound(raw: &str, extra_terms: &PhiTerms) -> RedactedText {
    let cleaned = remove_invisible_chars(raw);
    let (kept, dropped) = drop_instruction_lines(&cleaned);
    if dropped > 0 {
        tracing::warn!(dropped_lines = dropped, "Instruction-like lines removed from outbound text");
    }
    let redacted = redact(&normalize_blank_lines(&kept), extra_terms);
    let bounded = truncate_at_word(&redacted.0, MAX_OUTBOUND_LENGTH);
    tracing::debug!(
        terms = extra_terms.len(),
        outbound_len = bounded.len(),
        "Outbound text prepared"
    );
    RedactedText(bounded)
}

/// Expand placeholders into readable stand-ins for on-screen display.
pub fn public_safe(text: &str) -> String {
    text.replace(AGE_SEX_PLACEHOLDER, "the patient's age and sex")
        .replace(DOB_PLACEHOLDER, "the date of birth")
        .replace(AGE_PLACEHOLDER, "the patient's age")
        .replace(SEX_PLACEHOLDER, "the patient's sex")
        .replace(REDACTED, "the patient")
}

fn term_regex(term: &str) -> Option<Regex> {
    let escaped = regex::escape(term);
    let starts_word = term.chars().next().is_some_and(|c| c.is_alphanumeric());
    let ends_word = term.chars().last().is_some_and(|c| c.is_alphanumeric());
    let pattern = format!(
        "(?i){}{}{}",
        if starts_word { r"\b" } else { "" },
        escaped,
        if ends_word { r"\b" } else { "" }
    );
    Regex::new(&pattern).ok()
}

fn replace_case_insensitive(haystack: &str, needle: &str, replacement: &str) -> String {
    let lower_hay = haystack.to_lowercase();
    let lower_needle = needle.to_lowercase();
    if lower_needle.is_empty() || lower_hay.len() != haystack.len() {
        return haystack.to_string();
    }
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for (idx, _) in lower_hay.match_indices(&lower_needle) {
        out.push_str(&haystack[last..idx]);
        out.push_str(replacement);
        last = idx + lower_needle.len();
    }
    out.push_str(&haystack[last..]);
    out
}

/// Remove zero-width, bidi and control characters; keep ordinary whitespace.
pub(crate) fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if matches!(*c, ' ' | '\n' | '\t') {
                return true;
            }
            if matches!(
                *c,
                '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
            ) {
                return false;
            }
            !c.is_control()
        })
        .collect()
}

/// Lines that try to talk to the model rather than describe the scan.
fn is_instruction_line(lower: &str) -> bool {
    const PREFIXES: &[&str] = &[
        "system:", "assistant:", "user:", "[system]", "[inst]", "[/inst]", "<<sys>>", "<system",
        "</system", "note to ai:", "instructions:",
    ];
    const PHRASES: &[&str] = &[
        "ignore previous instructions",
        "ignore all instructions",
        "disregard your instructions",
        "forget your instructions",
        "new instructions:",
    ];
    PREFIXES.iter().any(|p| lower.starts_with(p)) || PHRASES.iter().any(|p| lower.contains(p))
}

fn drop_instruction_lines(text: &str) -> (String, usize) {
    let mut kept = Vec::new();
    let mut dropped = 0usize;
    for line in text.lines() {
        if is_instruction_line(&line.trim().to_lowercase()) {
            dropped += 1;
        } else {
            kept.push(line);
        }
    }
    (kept.join("\n"), dropped)
}

/// Trim each line and collapse runs of blank lines to one.
fn normalize_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }
    lines.join("\n")
}

/// Truncate to `max_len` bytes, backing up to a char and word boundary.
fn truncate_at_word(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let slice = &text[..end];
    match slice.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => slice[..pos].to_string(),
        _ => slice.to_string(),
    }
}
