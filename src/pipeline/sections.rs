//! Partition a report body into reason / technique / findings / impression.
//!
//! A heading is a known keyword at the start of a line followed by `:` or `-`
//! or by the end of the line. Each section runs until the next recognized
//! heading, whatever order the headings come in.

use std::sync::LazyLock;

use regex::Regex;

use super::text::normalize_report_text;
use super::types::ReportSections;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Reason,
    Technique,
    Findings,
    Impression,
    /// Recognized but not summarized (comparison, oral contrast).
    Other,
}

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(clinical\s+information|clinical\s+details|clinical\s+history|clinical\s+indications?|indications?|history|reason\s+for\s+(?:the\s+)?(?:scan|study|exam(?:ination)?|referral)|reason|technique|procedure(?:\s+details)?|findings?|impressions?|conclusions?|comparisons?|oral\s+contrast)[ \t]*(?:[:\-][ \t]*|$)",
    )
    .expect("valid regex")
});

/// Unanchored "FINDINGS" used when no findings heading was recognized.
static FINDINGS_ANYWHERE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfindings?\b[:\s\-]*").expect("valid regex"));

fn classify_heading(heading: &str) -> SectionKind {
    let lower = heading.to_lowercase();
    if lower.starts_with("technique") || lower.starts_with("procedure") {
        SectionKind::Technique
    } else if lower.starts_with("finding") {
        SectionKind::Findings
    } else if lower.starts_with("impression") || lower.starts_with("conclusion") {
        SectionKind::Impression
    } else if lower.starts_with("comparison") || lower.starts_with("oral") {
        SectionKind::Other
    } else {
        SectionKind::Reason
    }
}

static COMPARISON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[ \t]*comparisons?[ \t]*:[ \t]*(.+)$").expect("valid regex"));

static ORAL_CONTRAST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*oral[ \t]+contrast[ \t]*:[ \t]*(.+)$").expect("valid regex")
});

/// Text of a `Comparison:` line, or empty.
pub fn capture_comparison(raw: &str) -> String {
    capture_line(&COMPARISON_RE, raw)
}

/// Text of an `Oral contrast:` line, or empty.
pub fn capture_oral_contrast(raw: &str) -> String {
    capture_line(&ORAL_CONTRAST_RE, raw)
}

fn capture_line(re: &Regex, raw: &str) -> String {
    let text = normalize_report_text(raw);
    re.captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Split a raw report into its labeled sections.
pub fn split_sections(raw: &str) -> ReportSections {
    let text = normalize_report_text(raw);

    let headings: Vec<(SectionKind, usize, usize)> = HEADING_RE
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some((classify_heading(name.as_str()), whole.start(), whole.end()))
        })
        .collect();

    let mut sections = ReportSections::default();
    for (i, (kind, _, body_start)) in headings.iter().enumerate() {
        let body_end = headings
            .get(i + 1)
            .map(|(_, next_start, _)| *next_start)
            .unwrap_or(text.len());
        let body = text[*body_start..body_end].trim();
        if body.is_empty() {
            continue;
        }
        let slot = match kind {
            SectionKind::Reason => &mut sections.reason,
            SectionKind::Technique => &mut sections.technique,
            SectionKind::Findings => &mut sections.findings,
            SectionKind::Impression => &mut sections.impression,
            SectionKind::Other => continue,
        };
        if !slot.is_empty() {
            slot.push('\n');
        }
        slot.push_str(body);
    }

    if sections.findings.is_empty() {
        if let Some(m) = FINDINGS_ANYWHERE_RE.find(&text) {
            sections.findings = text[m.end()..].trim().to_string();
        }
    }

    tracing::debug!(
        headings = headings.len(),
        reason_len = sections.reason.len(),
        technique_len = sections.technique.len(),
        findings_len = sections.findings.len(),
        impression_len = sections.impression.len(),
        "Report sections split"
    );

    sections.raw_text = text;
    sections
}
