//! Deterministic rewriting of clinical text into lay language.
//!
//! Passes run in a fixed order: numbers and measurements, caller glossary,
//! built-in rule table, grammar cleanup, sentence case. The same simplifier is
//! applied to model output and to heuristic text.

pub mod grammar;
pub mod measure;
pub mod rules;

use std::sync::LazyLock;

use regex::Regex;

use crate::glossary::Glossary;

use super::text::split_sentences;

/// Dash and numbered list markers preserved at the start of a line.
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*([-•*]|\d+[.)])[ \t]+").expect("valid regex"));

#[derive(Debug, Clone, Default)]
pub struct JargonSimplifier {
    glossary: Glossary,
}

impl JargonSimplifier {
    pub fn new(glossary: Glossary) -> Self {
        Self { glossary }
    }

    /// Rewrite one sentence (or a short run of sentences on one line).
    pub fn simplify(&self, sentence: &str) -> String {
        let calm = split_sentences(sentence)
            .iter()
            .map(|s| grammar::lower_shouting(s))
            .collect::<Vec<_>>()
            .join(" ");
        if calm.is_empty() {
            return String::new();
        }

        let numbers = measure::normalize_numbers(&calm);
        let glossed = self.glossary.replace_terms(&numbers);
        let substituted = rules::apply_rules(&glossed);

        let cleaned = grammar::drop_filler(&substituted);
        let cleaned = grammar::fix_articles(&cleaned);
        let cleaned = grammar::drop_repeated_words(&cleaned);
        let cleaned = grammar::fix_spacing(&cleaned);

        split_sentences(&cleaned)
            .iter()
            .map(|s| grammar::fix_capitalization(s))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Simplify multi-line text line by line, keeping bullet markers and line breaks.
    pub fn simplify_text(&self, text: &str) -> String {
        text.lines()
            .filter_map(|line| {
                let (marker, body) = match BULLET_RE.captures(line) {
                    Some(caps) => {
                        let end = caps.get(0).map_or(0, |m| m.end());
                        (Some(caps[1].to_string()), &line[end..])
                    }
                    None => (None, line),
                };
                let simplified = self.simplify(body);
                if simplified.is_empty() {
                    return None;
                }
                Some(match marker {
                    Some(m) => format!("{m} {simplified}"),
                    None => simplified,
                })
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> JargonSimplifier {
        JargonSimplifier::default()
    }

    #[test]
    fn unmapped_text_passes_through() {
        assert_eq!(plain().simplify("  The   kidneys look fine. "), "The kidneys look fine.");
        assert_eq!(plain().simplify(""), "");
    }

    #[test]
    fn glossary_runs_before_rules() {
        let glossary = Glossary::try_from_pairs([("hepatomegaly", "swollen liver")]).unwrap();
        let s = JargonSimplifier::new(glossary);
        // The rule table alone would say "enlarged liver".
        assert_eq!(s.simplify("Hepatomegaly."), "Swollen liver.");
    }

    #[test]
    fn measurement_scenario() {
        let glossary = Glossary::try_from_pairs([("hepatomegaly", "enlarged liver")]).unwrap();
        let s = JargonSimplifier::new(glossary);
        let out = s.simplify("Hepatomegaly measuring 5 cm with 12 mm lesion.");
        assert_eq!(out, "Enlarged liver measuring 5 cm with 1.2 cm lesion.");
    }

    #[test]
    fn full_pass_on_typical_sentence() {
        let out = plain().simplify("THE LIVER IS UNREMARKABLE.");
        assert_eq!(out, "The liver looks normal.");
        let out = plain().simplify("a hypodense nodule is seen in the the right kidney .");
        assert_eq!(out, "A darker-looking small lump in the right kidney.");
    }

    #[test]
    fn article_fixed_after_substitution() {
        assert_eq!(plain().simplify("There is a effusion."), "There is a fluid build-up.");
        assert_eq!(plain().simplify("There is an nodule."), "There is a small lump.");
    }

    #[test]
    fn simplify_is_idempotent() {
        let inputs = [
            "Liver is normal. Spleen is unremarkable.",
            "Bilateral pleural effusions measuring 25 x 8 mm.",
            "CT SHOWS NO ACUTE ABNORMALITY.",
            "Mild hydronephrosis with 0.05 cm calculus and perilesional edema.",
            "Bowel obstruction with dilated loops.",
            "A 9.96 mm nodule.",
            "Type A aortic dissection.",
        ];
        let s = plain();
        for input in inputs {
            let once = s.simplify(input);
            assert_eq!(s.simplify(&once), once, "input: {input}");
        }
    }

    #[test]
    fn text_keeps_bullets_and_lines() {
        let out = plain().simplify_text("- liver is normal\n\n- 15 mm cyst\nspleen unremarkable.");
        assert_eq!(out, "- Liver looks normal\n- 1.5 cm cyst\nSpleen looks normal.");
    }

    #[test]
    fn text_keeps_numbered_markers() {
        let out = plain().simplify_text("1. simple renal cyst.\n2) 15 mm stone");
        assert_eq!(out, "1. Simple kidney cyst.\n2) 1.5 cm stone");
    }

    #[test]
    fn every_sentence_is_capitalized() {
        let out = plain().simplify("liver looks normal. spleen looks normal.");
        assert_eq!(out, "Liver looks normal. Spleen looks normal.");
    }
}
