//! Report processing orchestrator.
//!
//! Single entry point that drives the full report pipeline:
//! clean → {metadata, sections} → redact → summarize → per-field fallback →
//! simplify → annotate → assemble.
//!
//! The processor is built once by the host and reused for every report. It
//! owns the glossary-bound simplifier, the annotator and the optional summary
//! provider; nothing else is shared between invocations.

use std::sync::Arc;
use std::time::Instant;

use crate::config::SummaryConfig;
use crate::glossary::Glossary;
use crate::pipeline::annotate::Annotator;
use crate::pipeline::assemble::{assemble, ReportParts};
use crate::pipeline::fallback::{fallback_field, prune_labels_and_signatures};
use crate::pipeline::metadata::extract_metadata;
use crate::pipeline::redact::{phi_terms, prepare_outbound, public_safe, remove_invisible_chars};
use crate::pipeline::sections::{capture_comparison, capture_oral_contrast, split_sections};
use crate::pipeline::simplify::JargonSimplifier;
use crate::pipeline::summary::{CancelFlag, SummaryProvider};
use crate::pipeline::text::{normalize_report_text, strip_html_tags};
use crate::pipeline::types::{StructuredReport, SummaryField, SummaryResult, SummarySource};

/// Language used when the caller passes none.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Orchestrates one report from raw text to the final record.
pub struct ReportProcessor {
    simplifier: JargonSimplifier,
    annotator: Annotator,
    provider: Option<SummaryProvider>,
}

/// Sets the flag when the owning future is dropped before completion.
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl ReportProcessor {
    pub fn new(glossary: Glossary, provider: Option<SummaryProvider>) -> Self {
        Self {
            simplifier: JargonSimplifier::new(glossary),
            annotator: Annotator::new(),
            provider,
        }
    }

    /// Build with the provider configured from the process environment.
    pub fn from_env(glossary: Glossary) -> Self {
        Self::new(glossary, SummaryProvider::from_config(SummaryConfig::from_env()))
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Process a report. Always returns a complete record.
    pub fn process(&self, raw: &str, language: &str) -> StructuredReport {
        self.process_with_cancel(raw, language, &CancelFlag::new())
    }

    /// Process a report; a cancelled flag abandons the model call and the
    /// record is completed from heuristics.
    pub fn process_with_cancel(
        &self,
        raw: &str,
        language: &str,
        cancel: &CancelFlag,
    ) -> StructuredReport {
        self.run(raw, language, cancel, true)
    }

    /// Process on the blocking pool. Dropping the future cancels the model call.
    pub async fn process_async(self: Arc<Self>, raw: String, language: String) -> StructuredReport {
        let cancel = CancelFlag::new();
        let _guard = CancelOnDrop(cancel.clone());

        let worker = Arc::clone(&self);
        let (worker_raw, worker_language) = (raw.clone(), language.clone());
        let joined = tokio::task::spawn_blocking(move || {
            worker.process_with_cancel(&worker_raw, &worker_language, &cancel)
        })
        .await;

        match joined {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Report worker failed, using heuristics only");
                self.run(&raw, &language, &CancelFlag::new(), false)
            }
        }
    }

    fn run(&self, raw: &str, language: &str, cancel: &CancelFlag, use_provider: bool) -> StructuredReport {
        let started = Instant::now();
        let language = match language.trim() {
            "" => DEFAULT_LANGUAGE,
            trimmed => trimmed,
        };

        let text = remove_invisible_chars(&normalize_report_text(&strip_html_tags(raw)));
        let metadata = extract_metadata(&text);
        let sections = split_sections(&text);

        // Redaction happens whether or not a provider is configured.
        let terms = phi_terms(&metadata);
        let outbound = prepare_outbound(&text, &terms);

        let model = match (&self.provider, use_provider) {
            (Some(provider), true) => provider
                .summarize(&outbound, language, cancel)
                .filter(|summary| !summary.is_empty()),
            _ => None,
        };

        let mut summary = SummaryResult::default();
        let mut heuristic_fields = 0usize;
        for field in SummaryField::ALL {
            let from_model = model
                .as_ref()
                .map(|m| prune_labels_and_signatures(m.get(field)))
                .unwrap_or_default();
            let chosen = if from_model.is_empty() {
                let heuristic = prune_labels_and_signatures(&fallback_field(field, &metadata, &sections));
                if !heuristic.is_empty() {
                    heuristic_fields += 1;
                }
                tracing::debug!(field = field.key(), found = !heuristic.is_empty(), "Heuristic fallback used");
                heuristic
            } else {
                public_safe(&from_model)
            };
            summary.set(field, self.simplifier.simplify_text(&chosen));
        }

        let source = match (&model, heuristic_fields) {
            (None, _) => SummarySource::Heuristic,
            (Some(_), 0) => SummarySource::Model,
            (Some(_), _) => SummarySource::Partial,
        };

        let report = assemble(
            &self.annotator,
            ReportParts {
                comparison: capture_comparison(&text),
                oral_contrast: capture_oral_contrast(&text),
                metadata,
                summary,
                raw_text: &text,
                language,
                source,
            },
        );

        tracing::info!(
            source = ?report.summary_source,
            words = report.stats.word_count,
            positive = report.stats.highlights_positive,
            negative = report.stats.highlights_negative,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report processed"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::summary::{LlmClient, MockLlmClient, SummaryError};
    use crate::pipeline::text::{html_to_text, normalize_sentence_key, split_sentences};

    fn offline() -> ReportProcessor {
        ReportProcessor::new(Glossary::default(), None)
    }

    fn with_mock(mock: Arc<MockLlmClient>) -> ReportProcessor {
        let config = SummaryConfig {
            api_key: Some("test-key".into()),
            ..SummaryConfig::default()
        };
        let client: Arc<dyn LlmClient> = mock;
        ReportProcessor::new(
            Glossary::default(),
            Some(SummaryProvider::with_client(client, config)),
        )
    }

    const MODEL_REPLY: &str = r#"{
        "reason": "[REDACTED] had belly pain.",
        "technique": "CT scan of the belly with contrast dye.",
        "findings": "- The liver is unremarkable.\n- A 15 mm stone in the left kidney.",
        "conclusion": "- A 15 mm stone in the left kidney.",
        "concern": ""
    }"#;

    #[test]
    fn scenario_metadata_and_positive_findings() {
        let report = offline().process(
            "AGE: 45\nSEX: Female\nFINDINGS: No mass or lesion seen. Liver is normal.",
            "English",
        );
        assert_eq!(report.metadata.age, "45");
        assert_eq!(report.metadata.sex, "F");
        assert!(report.findings.contains(r#"<strong class="positive">No mass"#));
        assert!(report.findings.contains(r#"<strong class="positive">looks normal</strong>"#));
        assert_eq!(report.summary_source, SummarySource::Heuristic);
    }

    #[test]
    fn scenario_glossary_and_measurement() {
        let glossary = Glossary::try_from_pairs([("hepatomegaly", "enlarged liver")]).unwrap();
        let processor = ReportProcessor::new(glossary, None);
        let report = processor.process(
            "FINDINGS: Hepatomegaly measuring 5 cm with 12 mm lesion.",
            "English",
        );
        let findings = html_to_text(&report.findings).to_lowercase();
        assert!(findings.contains("enlarged liver"), "{findings}");
        assert!(findings.contains("1.2 cm"), "{findings}");
        assert!(!findings.contains("mm"), "{findings}");
    }

    #[test]
    fn scenario_empty_input_gives_sentinels() {
        let report = offline().process("", "English");
        assert_eq!(report.reason, "Not provided.");
        assert_eq!(report.technique, "Technique not described.");
        assert_eq!(report.findings, "No major problems were seen.");
        assert_eq!(report.conclusion, "See important findings.");
        assert_eq!(report.concern, "");
        assert_eq!(report.stats.word_count, 0);
    }

    #[test]
    fn scenario_obstruction_raises_concern() {
        let report = offline().process("The CT shows small bowel obstruction.", "English");
        let concern = html_to_text(&report.concern);
        assert!(concern.contains("obstruction"), "{concern}");
        assert!(report.concern.starts_with("<p>"));
    }

    #[test]
    fn every_field_is_filled_for_assorted_inputs() {
        let inputs = [
            "",
            "   \n\n ",
            "<p>FINDINGS:</p>",
            "Random text without structure",
            "IMPRESSION: Normal.",
            "CT HEAD\nTECHNIQUE: Axial sections.\nFINDINGS: Normal brain.",
        ];
        for input in inputs {
            let report = offline().process(input, "");
            for field in SummaryField::ALL {
                if field != SummaryField::Concern {
                    assert!(!report.field(field).is_empty(), "{field:?} empty for {input:?}");
                }
            }
            assert_eq!(report.language, DEFAULT_LANGUAGE);
        }
    }

    #[test]
    fn findings_never_repeat_conclusion() {
        let report = offline().process(
            "FINDINGS: Simple renal cyst. Liver is normal.\nIMPRESSION: Simple renal cyst.",
            "English",
        );
        assert!(report.conclusion.contains("cyst"));
        assert!(!report.findings.contains("cyst"));
        assert!(report.findings.contains("Liver"));
    }

    #[test]
    fn model_bullets_share_no_sentence_across_lists() {
        let reply = r#"{
            "findings": "- Liver looks normal. A small cyst in the kidney.",
            "conclusion": "- A small cyst in the kidney."
        }"#;
        let report = with_mock(Arc::new(MockLlmClient::new(reply)))
            .process("FINDINGS: Renal cyst.", "English");

        let keys = |html: &str| -> Vec<String> {
            split_sentences(&html_to_text(html))
                .iter()
                .map(|s| normalize_sentence_key(s))
                .collect()
        };
        let conclusion = keys(&report.conclusion);
        let shared: Vec<String> = keys(&report.findings)
            .into_iter()
            .filter(|k| conclusion.contains(k))
            .collect();
        assert!(shared.is_empty(), "shared sentences: {shared:?}");
        assert!(report.findings.contains("Liver"));
    }

    #[test]
    fn numbered_impression_renders_one_item_per_line() {
        let report = offline().process(
            "FINDINGS: Small cyst.\nIMPRESSION:\n1. Simple renal cyst.\n2. No stones.",
            "English",
        );
        assert_eq!(report.conclusion.matches("<li>").count(), 2, "{}", report.conclusion);
        assert!(!report.conclusion.contains("2."));
    }

    #[test]
    fn offline_output_is_deterministic() {
        let raw = "NAIROBI RADIOLOGY HOSPITAL\nNAME: Jane Doe\nDATE: 02/03/2024\n\
                   CT ABDOMEN\nFINDINGS: 23 mm mass compressing the bowel.\nIMPRESSION: Mass.";
        let first = serde_json::to_string(&offline().process(raw, "English")).unwrap();
        let second = serde_json::to_string(&offline().process(raw, "English")).unwrap();
        assert_eq!(first, second);
        assert!(first.contains(r#""study_date":"2024-03-02""#));
    }

    #[test]
    fn comparison_and_oral_contrast_are_captured() {
        let report = offline().process(
            "COMPARISON: CT of 2023.\nOral contrast: Given.\nFINDINGS: Normal.",
            "English",
        );
        assert_eq!(report.comparison, "CT of 2023.");
        assert_eq!(report.oral_contrast, "Given.");
    }

    #[test]
    fn outbound_text_is_redacted() {
        let mock = Arc::new(MockLlmClient::new(MODEL_REPLY));
        let processor = with_mock(Arc::clone(&mock));
        processor.process(
            "NAME: Jane Doe\nAGE: 45\nFINDINGS: Jane Doe has a 2 cm cyst. JANE DOE agreed.",
            "English",
        );
        let requests = mock.requests();
        assert!(!requests.is_empty());
        for request in requests {
            assert!(!request.user.to_lowercase().contains("jane"), "{}", request.user);
            assert!(request.user.contains("[REDACTED]"));
        }
    }

    #[test]
    fn model_summary_is_polished_and_rendered() {
        let mock = Arc::new(MockLlmClient::new(MODEL_REPLY));
        let processor = with_mock(Arc::clone(&mock));
        let report = processor.process("FINDINGS: Left renal calculus 15 mm.", "English");

        // Concern was left empty by the model and found nothing in the text.
        assert_eq!(report.summary_source, SummarySource::Model);
        assert_eq!(report.reason, "<p>The patient had belly pain.</p>");
        assert!(report.findings.contains("looks normal"));
        assert!(report.findings.contains("<li>"));
        // The stone sentence lives in the conclusion only, converted to cm.
        assert!(!report.findings.contains("stone"));
        assert!(report.conclusion.contains("1.5 cm stone"));
        assert_eq!(report.concern, "");
    }

    #[test]
    fn missing_model_fields_are_filled_from_heuristics() {
        let mock = Arc::new(MockLlmClient::new(r#"{"reason": "Check the belly."}"#));
        let processor = with_mock(mock);
        let report = processor.process(
            "CT ABDOMEN\nFINDINGS: Small bowel obstruction.",
            "English",
        );
        assert_eq!(report.summary_source, SummarySource::Partial);
        assert_eq!(report.reason, "<p>Check the belly.</p>");
        assert!(report.technique.contains("CT scan"));
        assert!(html_to_text(&report.concern).contains("obstruction"));
    }

    #[test]
    fn provider_failure_degrades_to_heuristics() {
        let mock = Arc::new(MockLlmClient::scripted(vec![Err(SummaryError::Timeout(60))]));
        let processor = with_mock(mock);
        let report = processor.process("FINDINGS: Liver is normal.", "English");
        assert_eq!(report.summary_source, SummarySource::Heuristic);
        assert!(report.findings.contains("looks normal"));
    }

    #[test]
    fn cancelled_run_completes_from_heuristics() {
        let mock = Arc::new(MockLlmClient::new(MODEL_REPLY));
        let processor = with_mock(Arc::clone(&mock));
        let cancel = CancelFlag::new();
        cancel.cancel();
        let report = processor.process_with_cancel("FINDINGS: Liver is normal.", "English", &cancel);
        assert_eq!(report.summary_source, SummarySource::Heuristic);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn async_entry_point_matches_sync() {
        let mock = Arc::new(MockLlmClient::new(MODEL_REPLY));
        let processor = Arc::new(with_mock(mock));
        let raw = "FINDINGS: Left renal calculus 15 mm.";
        let expected = processor.process(raw, "English");
        let report = Arc::clone(&processor)
            .process_async(raw.to_string(), "English".to_string())
            .await;
        assert_eq!(report, expected);
    }
}
