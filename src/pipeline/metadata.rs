//! Best-effort extraction of patient and study attributes from report headers.
//!
//! Runs on the original (un-redacted) text. Never fails: anything that does
//! not match stays an empty string.

use std::sync::LazyLock;

use regex::Regex;

use super::text::normalize_report_text;
use super::types::ReportMetadata;

/// Only the top of the document is searched for a hospital banner.
const HOSPITAL_SCAN_LINES: usize = 10;
/// At most this many consecutive banner lines are joined.
const HOSPITAL_MAX_LINES: usize = 2;

static UPPER_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9&@/()'’.,\- ]{12,}$").expect("valid regex")
});

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bNAME\b[:\s\-]*([A-Z][A-Za-z' .\-]*)").expect("valid regex")
});

/// A label that ran onto the same line as the name ("Jane Doe AGE").
static TRAILING_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s+)\b(?:AGE|SEX|GENDER|DATE|DOB|MRN|ID|HOSP(?:ITAL)?|REF)\b.*$")
        .expect("valid regex")
});

static AGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAGE\b[:\s\-]*([0-9]{1,3})").expect("valid regex"));

static SEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:SEX|GENDER)\b[:\s\-]*(Male|Female|M|F)\b").expect("valid regex")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bDATE\b[:\s]*([0-9]{4}-[0-9]{2}-[0-9]{2}|[0-9]{1,2}[-/.][0-9]{1,2}[-/.][0-9]{2,4}|[0-9]{1,2}\s+[A-Za-z]{3,9}\s+[0-9]{4})",
    )
    .expect("valid regex")
});

static STUDY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:CT|MRI|X[- ]?RAY|ULTRASOUND|USG)\b[^\n]{0,60}$").expect("valid regex")
});

static HISTORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:CLINICAL\s+)?(?:HISTORY|INDICATIONS?)[ \t]*[:\-][ \t]*([^\n]+)$")
        .expect("valid regex")
});

/// Extract header metadata from a raw report.
pub fn extract_metadata(raw: &str) -> ReportMetadata {
    let text = normalize_report_text(raw);
    ReportMetadata {
        name: extract_name(&text),
        age: capture(&AGE_RE, &text),
        sex: extract_sex(&text),
        hospital: extract_hospital(&text),
        date: capture(&DATE_RE, &text),
        study: STUDY_RE
            .find(&text)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        history: capture(&HISTORY_RE, &text),
    }
}

fn capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn extract_name(text: &str) -> String {
    let raw = capture(&NAME_RE, text);
    let cut = TRAILING_LABEL_RE.replace(&raw, "");
    cut.trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '.')
        .to_string()
}

fn extract_sex(text: &str) -> String {
    let value = capture(&SEX_RE, text).to_lowercase();
    if value.starts_with('m') {
        "M".to_string()
    } else if value.starts_with('f') {
        "F".to_string()
    } else {
        String::new()
    }
}

/// Join the first run of banner-style uppercase lines near the top.
fn extract_hospital(text: &str) -> String {
    let mut banner: Vec<&str> = Vec::new();
    for line in text.lines().take(HOSPITAL_SCAN_LINES) {
        let trimmed = line.trim();
        if UPPER_LINE_RE.is_match(trimmed) {
            banner.push(trimmed);
        } else if !banner.is_empty() {
            break;
        }
    }
    banner
        .into_iter()
        .take(HOSPITAL_MAX_LINES)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> &'static str {
        "NAIROBI RADIOLOGY HOSPITAL\n\
         DEPARTMENT OF IMAGING\n\
         NAME: Jane Doe\n\
         AGE: 42\n\
         SEX: Female\n\
         DATE: 01/01/2025\n\
         MRI BRAIN WITH AND WITHOUT CONTRAST\n\
         \n\
         CLINICAL HISTORY: Headache and new onset weakness.\n\
         TECHNIQUE: MRI brain performed without and with contrast.\n\
         FINDINGS: Mass measuring 2.3 cm causes mild compression of the adjacent ventricle.\n\
         IMPRESSION: Findings concerning for metastatic disease.\n"
    }

    #[test]
    fn extracts_all_header_fields() {
        let meta = extract_metadata(sample_report());
        assert_eq!(meta.name, "Jane Doe");
        assert_eq!(meta.age, "42");
        assert_eq!(meta.sex, "F");
        assert_eq!(meta.date, "01/01/2025");
        assert_eq!(meta.hospital, "NAIROBI RADIOLOGY HOSPITAL DEPARTMENT OF IMAGING");
        assert!(meta.study.starts_with("MRI BRAIN"));
        assert_eq!(meta.history, "Headache and new onset weakness.");
    }

    #[test]
    fn empty_input_yields_empty_fields() {
        assert_eq!(extract_metadata(""), ReportMetadata::default());
    }

    #[test]
    fn sex_variants_normalize_to_single_letter() {
        assert_eq!(extract_metadata("SEX: m").sex, "M");
        assert_eq!(extract_metadata("Sex - MALE").sex, "M");
        assert_eq!(extract_metadata("GENDER: F").sex, "F");
        assert_eq!(extract_metadata("SEX: unknown").sex, "");
    }

    #[test]
    fn name_stops_before_inline_label() {
        let meta = extract_metadata("PATIENT NAME: John Smith AGE: 61 SEX: M");
        assert_eq!(meta.name, "John Smith");
        assert_eq!(meta.age, "61");
        assert_eq!(meta.sex, "M");
    }

    #[test]
    fn blank_name_label_does_not_swallow_next_label() {
        assert_eq!(extract_metadata("NAME:\nAGE: 42").name, "");
    }

    #[test]
    fn age_takes_at_most_three_digits() {
        assert_eq!(extract_metadata("AGE: 45Y").age, "45");
        assert_eq!(extract_metadata("Age:7").age, "7");
    }

    #[test]
    fn textual_date_is_recognized() {
        assert_eq!(extract_metadata("Date: 5 March 2024").date, "5 March 2024");
        assert_eq!(extract_metadata("DATE 2024-03-05").date, "2024-03-05");
    }

    #[test]
    fn study_line_must_start_with_modality() {
        let meta = extract_metadata("Requested: CT chest\nCT CHEST WITH CONTRAST\n");
        assert_eq!(meta.study, "CT CHEST WITH CONTRAST");
    }

    #[test]
    fn hospital_requires_long_uppercase_lines() {
        let meta = extract_metadata("ST MARY\nCITY GENERAL HOSPITAL\nNAME: A B");
        assert_eq!(meta.hospital, "CITY GENERAL HOSPITAL");
    }

    #[test]
    fn scenario_age_and_sex() {
        let meta = extract_metadata(
            "AGE: 45\nSEX: Female\nFINDINGS: No mass or lesion seen. Liver is normal.",
        );
        assert_eq!(meta.age, "45");
        assert_eq!(meta.sex, "F");
    }
}
