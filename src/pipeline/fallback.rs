//! Deterministic per-field heuristics used whenever the model leaves a field empty.
//!
//! Each field has its own ladder and never looks at the others. An empty
//! string means the ladder found nothing; the assembler substitutes the
//! field's sentinel.

use std::sync::LazyLock;

use regex::Regex;

use super::text::{collapse_whitespace, normalize_sentence_key, split_sentences};
use super::types::{ReportMetadata, ReportSections, SummaryField};

/// Findings sentences kept by the heuristic.
const MAX_FINDINGS_SENTENCES: usize = 4;

/// Terms that make a findings sentence worth keeping.
const KEY_FINDING_TERMS: &[&str] = &[
    "mass", "lesion", "tumou?r", "nodules?", "cysts?", "fractures?", "bleed(?:ing)?",
    "ha?emorrhage", "obstruction", "compression", "dilat(?:ed|ation|ion)", "effusions?", "stones?",
    "calculi", "calculus", "enlarged", "hydronephrosis", "collections?", "abscess", "thickening",
    "metastas[ie]s", "metastatic", "adenopathy", "lymphadenopathy", "herniation", "o?edema",
    "invasion", "perforation", "ischa?emia", "appendicitis", "necrotic", "stenosis", "thrombus",
    "aneurysm", "hepatomegaly", "splenomegaly",
];

/// Keywords that pull a sentence into the conclusion when no impression exists.
const CONCERNING_TERMS: &[&str] = &[
    "mass", "obstruction", "compression", "dilation", "fracture", "bleed", "appendicitis",
    "adenopathy", "necrotic",
];

/// Keywords that raise a concern, in priority order.
const URGENT_TERMS: &[&str] = &["obstruction", "compression", "invasion", "perforation", "ischemia"];

static KEY_FINDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", KEY_FINDING_TERMS.join("|"))).expect("valid regex")
});

static MEASUREMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:mm|cm)\b").expect("valid regex"));

static NORMAL_STATEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:normal|unremarkable|within normal limits|no (?:acute|significant|focal)\b)")
        .expect("valid regex")
});

static CONCERNING_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    CONCERNING_TERMS
        .iter()
        .map(|kw| Regex::new(&format!(r"(?i)\b{kw}\b")).expect("valid regex"))
        .collect()
});

static URGENT_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    URGENT_TERMS
        .iter()
        .map(|kw| (*kw, Regex::new(&format!(r"(?i)\b{kw}\b")).expect("valid regex")))
        .collect()
});

static NEGATION_CUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:no|not|without|negative for|free of)\b").expect("valid regex")
});

static LABEL_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:reason|indications?|procedure|technique|findings?|impressions?|conclusions?|ddx|comparison|note of concern|concern)[ \t]*:[ \t]*",
    )
    .expect("valid regex")
});

static INLINE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:findings?|impression|conclusion|ddx)[ \t]*:[ \t]*").expect("valid regex")
});

static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[ \t]*(?:dr\.?\s|reported\s+by\b|electronically\s+signed\b|signed\b|dictated\s+by\b|verified\s+by\b|consultant\s+radiologist\b|radiologist\s*:)",
    )
    .expect("valid regex")
});

// ═══════════════════════════════════════════════════════════
// Modality / region vocabulary
// ═══════════════════════════════════════════════════════════

static MODALITIES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("MRI scan", r"(?i)\bmri\b|magnetic resonance|\bmr\s+(?:scan|imaging|angiogra\w*)"),
        ("CT scan", r"(?i)\bc\.?t\.?\b|\bcect\b|computed tomography"),
        ("Ultrasound scan", r"(?i)ultrasound|sonograph|\bUSG\b|\bdoppler\b"),
        ("X-ray", r"(?i)\bx-?ray|radiograph"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("valid regex")))
    .collect()
});

/// Body regions in ladder order.
static REGIONS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("abdomen", r"(?i)\b(?:abdomen|abdominal|belly|liver|kidneys?|renal|spleen|pancrea\w*|bowel|append\w*|gall\s?bladder)\b"),
        ("pelvis", r"(?i)\b(?:pelvis|pelvic|bladder|uterus|uterine|ovar\w*|prostate)\b"),
        ("chest", r"(?i)\b(?:chest|thorax|lungs?|pulmonary|heart|cardiac|mediastin\w*)\b"),
        ("spine", r"(?i)\b(?:spine|spinal|vertebra\w*|lumbar|disc|discs)\b"),
        ("neck", r"(?i)\b(?:neck|thyroid|cervical|larynx|pharynx)\b"),
        ("head", r"(?i)\b(?:head|brain|skull|cranial|intracranial|sinus\w*|orbits?)\b"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("valid regex")))
    .collect()
});

static CONTRAST_BOTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:with(?:out)?\s+and\s+with(?:out)?\s+(?:iv\s+)?contrast|pre[- ]?\s*(?:and|&)\s*post[- ]?\s*contrast|plain\s+and\s+contrast)")
        .expect("valid regex")
});
static CONTRAST_WITHOUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:without\s+(?:iv\s+)?contrast|non[- ]?contrast|unenhanced|non[- ]?enhanced)\b")
        .expect("valid regex")
});
static CONTRAST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcontrast\b").expect("valid regex"));
static PLANES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(axial|coronal|sagittal)\b").expect("valid regex"));
static COVERAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bfrom\s+(?:the\s+)?([a-z][a-z\-]*(?:\s+[a-z][a-z\-]*){0,2}?)\s+to\s+(?:the\s+)?([a-z][a-z\-]*(?:\s+[a-z][a-z\-]*){0,2}?)(?:\s+(?:with|without|using|in|and|after|before)\b|[.,;\n]|$)",
    )
    .expect("valid regex")
});
static BRAIN_WINDOW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbrain window\b").expect("valid regex"));

static MASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:mass|masses|tumou?rs?|neoplasm|malignan\w*|growth|space[- ]occupying)\b")
        .expect("valid regex")
});
static LYMPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:lymph\s+nodes?|(?:lymph)?adenopathy|lymphoma)\b").expect("valid regex")
});

/// Heuristic text for one field. Empty when the ladder finds nothing.
pub fn fallback_field(field: SummaryField, meta: &ReportMetadata, sections: &ReportSections) -> String {
    match field {
        SummaryField::Reason => infer_reason(meta, sections),
        SummaryField::Technique => infer_technique(meta, sections),
        SummaryField::Findings => pick_findings(sections),
        SummaryField::Conclusion => pick_conclusion(sections),
        SummaryField::Concern => detect_concern(&sections.raw_text),
    }
}

/// Remove section labels and signature lines from heuristic or model text.
pub fn prune_labels_and_signatures(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !SIGNATURE_RE.is_match(line))
        .collect();
    let joined = kept.join("\n");
    let unlabeled = LABEL_PREFIX_RE.replace_all(&joined, "");
    INLINE_LABEL_RE.replace_all(&unlabeled, "").trim().to_string()
}

// ═══════════════════════════════════════════════════════════
// Reason
// ═══════════════════════════════════════════════════════════

fn infer_reason(meta: &ReportMetadata, sections: &ReportSections) -> String {
    if sections.raw_text.trim().is_empty() {
        return String::new();
    }

    let explicit = if !sections.reason.trim().is_empty() {
        sections.reason.as_str()
    } else {
        meta.history.as_str()
    };
    let explicit = prune_labels_and_signatures(explicit);
    if !explicit.is_empty() {
        return collapse_whitespace(&explicit);
    }

    let text = &sections.raw_text;
    if MASS_RE.is_match(text) {
        let mut reason = "The scan was ordered to investigate a mass.".to_string();
        if LYMPH_RE.is_match(text) {
            reason.push_str(" Doctors also wanted to check the lymph nodes.");
        }
        return reason;
    }
    if LYMPH_RE.is_match(text) {
        return "The scan was ordered to check the lymph nodes.".to_string();
    }
    format!(
        "The scan was done to look for a problem in the {}.",
        detect_region(text).unwrap_or("area")
    )
}

// ═══════════════════════════════════════════════════════════
// Technique
// ═══════════════════════════════════════════════════════════

fn infer_technique(meta: &ReportMetadata, sections: &ReportSections) -> String {
    let focused = format!("{}\n{}", meta.study, sections.technique);
    if let Some(detailed) = describe_technique(&focused, true) {
        return detailed;
    }
    describe_technique(&sections.raw_text, false).unwrap_or_default()
}

fn describe_technique(text: &str, detailed: bool) -> Option<String> {
    let modality = MODALITIES
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(label, _)| *label)?;

    let mut sentence = modality.to_string();
    if let Some(region) = detect_region(text) {
        sentence.push_str(" of the ");
        sentence.push_str(region);
    }
    if CONTRAST_BOTH_RE.is_match(text) {
        sentence.push_str(" without and with contrast dye");
    } else if CONTRAST_WITHOUT_RE.is_match(text) {
        sentence.push_str(" without contrast dye");
    } else if CONTRAST_RE.is_match(text) {
        sentence.push_str(" with contrast dye");
    }
    sentence.push('.');

    if !detailed {
        return Some(sentence);
    }

    let mut parts = vec![sentence];
    let mut planes: Vec<String> = Vec::new();
    for caps in PLANES_RE.captures_iter(text) {
        let plane = caps[1].to_lowercase();
        if !planes.contains(&plane) {
            planes.push(plane);
        }
    }
    if !planes.is_empty() {
        parts.push(format!("Pictures were taken in the {} views.", join_words(&planes)));
    }
    if let Some(caps) = COVERAGE_RE.captures(text) {
        parts.push(format!(
            "The pictures covered from the {} to the {}.",
            caps[1].trim().to_lowercase(),
            caps[2].trim().to_lowercase()
        ));
    }
    if BRAIN_WINDOW_RE.is_match(text) {
        parts.push("Images were also reviewed in brain window.".to_string());
    }
    Some(parts.join(" "))
}

fn detect_region(text: &str) -> Option<&'static str> {
    REGIONS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(label, _)| *label)
}

fn join_words(words: &[String]) -> String {
    match words {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

// ═══════════════════════════════════════════════════════════
// Findings / conclusion / concern
// ═══════════════════════════════════════════════════════════

fn pick_findings(sections: &ReportSections) -> String {
    let source = if sections.findings.trim().is_empty() {
        &sections.raw_text
    } else {
        &sections.findings
    };

    let mut seen: Vec<String> = Vec::new();
    let mut picked: Vec<String> = Vec::new();
    for sentence in split_sentences(&prune_labels_and_signatures(source)) {
        if picked.len() >= MAX_FINDINGS_SENTENCES {
            break;
        }
        let relevant = MEASUREMENT_RE.is_match(&sentence)
            || KEY_FINDING_RE.is_match(&sentence)
            || NORMAL_STATEMENT_RE.is_match(&sentence);
        let key = normalize_sentence_key(&sentence);
        if relevant && !key.is_empty() && !seen.contains(&key) {
            seen.push(key);
            picked.push(sentence);
        }
    }
    picked.join(" ")
}

fn pick_conclusion(sections: &ReportSections) -> String {
    let impression = prune_labels_and_signatures(&sections.impression);
    if !impression.is_empty() {
        // Numbered and bulleted impressions stay one item per line.
        return impression
            .lines()
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
    }

    let sentences = split_sentences(&prune_labels_and_signatures(&sections.raw_text));
    let mut picked: Vec<&str> = Vec::new();
    for re in CONCERNING_RES.iter() {
        if let Some(sentence) = sentences.iter().find(|s| affirmed(re, s)) {
            if !picked.contains(&sentence.as_str()) {
                picked.push(sentence);
            }
        }
    }
    picked.join(" ")
}

/// True when `re` matches somewhere not preceded by a negation in the sentence.
fn affirmed(re: &Regex, sentence: &str) -> bool {
    let first_cue = NEGATION_CUE_RE.find(sentence).map(|m| m.start());
    re.find_iter(sentence)
        .any(|m| first_cue.map_or(true, |cue| m.start() < cue))
}

fn detect_concern(text: &str) -> String {
    URGENT_RES
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(kw, _)| format!("The findings include {kw}. Discuss next steps with your clinician."))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::metadata::extract_metadata;
    use crate::pipeline::sections::split_sections;

    fn run(field: SummaryField, report: &str) -> String {
        fallback_field(field, &extract_metadata(report), &split_sections(report))
    }

    #[test]
    fn blank_input_yields_nothing() {
        for field in SummaryField::ALL {
            assert_eq!(run(field, "   "), "", "{field:?}");
        }
    }

    #[test]
    fn reason_prefers_explicit_header() {
        assert_eq!(
            run(SummaryField::Reason, "INDICATION: Right upper quadrant pain.\nFINDINGS: Normal."),
            "Right upper quadrant pain."
        );
    }

    #[test]
    fn reason_infers_mass_and_lymph_nodes() {
        let reason = run(SummaryField::Reason, "FINDINGS: Large mass with adjacent lymphadenopathy.");
        assert_eq!(
            reason,
            "The scan was ordered to investigate a mass. Doctors also wanted to check the lymph nodes."
        );
    }

    #[test]
    fn reason_region_ladder() {
        assert_eq!(
            run(SummaryField::Reason, "FINDINGS: The liver and lungs look fine."),
            "The scan was done to look for a problem in the abdomen."
        );
        assert_eq!(
            run(SummaryField::Reason, "FINDINGS: Brain parenchyma is fine."),
            "The scan was done to look for a problem in the head."
        );
        assert_eq!(
            run(SummaryField::Reason, "FINDINGS: Nothing to report."),
            "The scan was done to look for a problem in the area."
        );
    }

    #[test]
    fn technique_from_study_and_technique_section() {
        let report = "CT ABDOMEN AND PELVIS\n\
                      TECHNIQUE: Axial images from the diaphragm to the pubic symphysis without and with IV contrast. Coronal reformats.\n\
                      FINDINGS: Normal.";
        assert_eq!(
            run(SummaryField::Technique, report),
            "CT scan of the abdomen without and with contrast dye. \
             Pictures were taken in the axial and coronal views. \
             The pictures covered from the diaphragm to the pubic symphysis."
        );
    }

    #[test]
    fn technique_brain_window() {
        let report = "CT BRAIN\nTECHNIQUE: Non-contrast axial sections in brain window.";
        assert_eq!(
            run(SummaryField::Technique, report),
            "CT scan of the head without contrast dye. Pictures were taken in the axial views. \
             Images were also reviewed in brain window."
        );
    }

    #[test]
    fn technique_coarse_inference_then_empty() {
        assert_eq!(
            run(SummaryField::Technique, "FINDINGS: On this MRI the spine is straight."),
            "MRI scan of the spine."
        );
        assert_eq!(run(SummaryField::Technique, "FINDINGS: All normal."), "");
    }

    #[test]
    fn findings_keep_relevant_sentences_up_to_four() {
        let report = "FINDINGS: Patient was cooperative. A 12 mm cyst in the kidney. \
                      Liver is normal. Small effusion. Bowel loops fine. Fracture of rib. \
                      Mild edema.";
        assert_eq!(
            run(SummaryField::Findings, report),
            "A 12 mm cyst in the kidney. Liver is normal. Small effusion. Fracture of rib."
        );
    }

    #[test]
    fn findings_use_whole_text_without_section() {
        let report = "Ultrasound done. No free fluid. Gallbladder normal.";
        assert_eq!(run(SummaryField::Findings, report), "Gallbladder normal.");
    }

    #[test]
    fn conclusion_prefers_impression_then_keywords() {
        assert_eq!(
            run(SummaryField::Conclusion, "FINDINGS: x.\nIMPRESSION: Simple renal cyst."),
            "Simple renal cyst."
        );
        let report = "FINDINGS: A mass in the colon. It causes obstruction of the bowel. Mass again noted.";
        assert_eq!(
            run(SummaryField::Conclusion, report),
            "A mass in the colon. It causes obstruction of the bowel."
        );
        assert_eq!(run(SummaryField::Conclusion, "FINDINGS: Normal study."), "");
        assert_eq!(run(SummaryField::Conclusion, "FINDINGS: No mass or lesion seen."), "");
    }

    #[test]
    fn concern_from_urgent_keyword() {
        assert_eq!(
            run(SummaryField::Concern, "FINDINGS: Small bowel obstruction."),
            "The findings include obstruction. Discuss next steps with your clinician."
        );
        assert_eq!(
            run(SummaryField::Concern, "Perforation and compression."),
            "The findings include compression. Discuss next steps with your clinician."
        );
        assert_eq!(run(SummaryField::Concern, "FINDINGS: Normal."), "");
    }

    #[test]
    fn prune_removes_labels_and_signatures() {
        let text = "Impression: Simple cyst.\nDDX: abscess\nDr. A. Mwangi\nReported by: X";
        assert_eq!(prune_labels_and_signatures(text), "Simple cyst.\nabscess");
    }

    #[test]
    fn compose_fills_every_field_for_real_report() {
        let report = "CT ABDOMEN\nCLINICAL HISTORY: Pain.\nFINDINGS: Bowel obstruction with 3 cm mass.\nIMPRESSION: Obstructing mass.";
        let (meta, sections) = (extract_metadata(report), split_sections(report));
        for field in SummaryField::ALL {
            assert!(!fallback_field(field, &meta, &sections).is_empty(), "{field:?}");
        }
    }

    #[test]
    fn numbered_impression_keeps_one_line_per_item() {
        let report = "FINDINGS: Small cyst.\nIMPRESSION:\n1. Simple renal   cyst.\n2. No stones.";
        assert_eq!(
            run(SummaryField::Conclusion, report),
            "1. Simple renal cyst.\n2. No stones."
        );
    }
}
