use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Patient and study attributes pulled from header-style lines.
/// Every field is an empty string when it could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub name: String,
    pub age: String,
    pub sex: String,
    pub hospital: String,
    pub date: String,
    pub study: String,
    pub history: String,
}

impl ReportMetadata {
    /// Parse the free-form `date` field into a calendar date.
    pub fn study_date(&self) -> Option<NaiveDate> {
        parse_report_date(&self.date)
    }
}

/// Parse dates in the shapes radiology headers commonly use.
/// Day-first is tried before month-first.
pub fn parse_report_date(date_str: &str) -> Option<NaiveDate> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    const NUMERIC_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%d/%m/%y", "%d-%m-%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%m/%d/%Y",
    ];
    for fmt in NUMERIC_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }

    // "5 March 2024" / "05 Mar 2024"
    for fmt in ["%d %B %Y", "%d %b %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    None
}

/// Report body partitioned by heading keywords. Sections may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSections {
    pub reason: String,
    pub technique: String,
    pub findings: String,
    pub impression: String,
    pub raw_text: String,
}

/// The five narrative fields of a lay summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryField {
    Reason,
    Technique,
    Findings,
    Conclusion,
    Concern,
}

impl SummaryField {
    /// All fields in their fixed output order.
    pub const ALL: [SummaryField; 5] = [
        SummaryField::Reason,
        SummaryField::Technique,
        SummaryField::Findings,
        SummaryField::Conclusion,
        SummaryField::Concern,
    ];

    /// JSON key used in the model contract.
    pub fn key(&self) -> &'static str {
        match self {
            SummaryField::Reason => "reason",
            SummaryField::Technique => "technique",
            SummaryField::Findings => "findings",
            SummaryField::Conclusion => "conclusion",
            SummaryField::Concern => "concern",
        }
    }

    /// Text shown when neither the model nor the heuristics produced anything.
    pub fn sentinel(&self) -> &'static str {
        match self {
            SummaryField::Reason => "Not provided.",
            SummaryField::Technique => "Technique not described.",
            SummaryField::Findings => "No major problems were seen.",
            SummaryField::Conclusion => "See important findings.",
            SummaryField::Concern => "",
        }
    }
}

/// Plain-text lay summary. All five keys always exist; any may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub reason: String,
    pub technique: String,
    pub findings: String,
    pub conclusion: String,
    pub concern: String,
}

impl SummaryResult {
    pub fn get(&self, field: SummaryField) -> &str {
        match field {
            SummaryField::Reason => &self.reason,
            SummaryField::Technique => &self.technique,
            SummaryField::Findings => &self.findings,
            SummaryField::Conclusion => &self.conclusion,
            SummaryField::Concern => &self.concern,
        }
    }

    pub fn set(&mut self, field: SummaryField, value: String) {
        match field {
            SummaryField::Reason => self.reason = value,
            SummaryField::Technique => self.technique = value,
            SummaryField::Findings => self.findings = value,
            SummaryField::Conclusion => self.conclusion = value,
            SummaryField::Concern => self.concern = value,
        }
    }

    /// True when every field is blank.
    pub fn is_empty(&self) -> bool {
        SummaryField::ALL.iter().all(|f| self.get(*f).trim().is_empty())
    }
}

/// Where the narrative fields of a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// Every field came from the language model.
    Model,
    /// The model answered but some fields were filled by heuristics.
    Partial,
    /// No model output was used.
    Heuristic,
}

/// Counts derived from the input text and the rendered highlights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub word_count: usize,
    pub sentence_count: usize,
    pub highlights_positive: usize,
    pub highlights_negative: usize,
}

/// Final record handed to the rendering and persistence collaborators.
///
/// Narrative fields carry HTML markup. Nothing time- or randomness-dependent
/// is stored here, so identical inputs produce identical records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredReport {
    pub metadata: ReportMetadata,
    pub study_date: Option<NaiveDate>,
    pub language: String,
    pub reason: String,
    pub technique: String,
    pub findings: String,
    pub conclusion: String,
    pub concern: String,
    pub comparison: String,
    pub oral_contrast: String,
    pub stats: ReportStats,
    pub summary_source: SummarySource,
}

impl StructuredReport {
    pub fn field(&self, field: SummaryField) -> &str {
        match field {
            SummaryField::Reason => &self.reason,
            SummaryField::Technique => &self.technique,
            SummaryField::Findings => &self.findings,
            SummaryField::Conclusion => &self.conclusion,
            SummaryField::Concern => &self.concern,
        }
    }
}
