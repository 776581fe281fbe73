//! Built-in jargon table.
//!
//! Entries are `(pattern, replacement, priority)`. Higher priority runs first,
//! then longer patterns, so phrases are rewritten before the single words
//! they contain. No replacement may match any pattern in the table.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

const PHRASE: u8 = 3;
const TERM: u8 = 2;
const WORD: u8 = 1;

const RULES: &[(&str, &str, u8)] = &[
    // Phrases
    (r"\bis unremarkable\b", "looks normal", PHRASE),
    (r"\bare unremarkable\b", "look normal", PHRASE),
    (r"\bappears unremarkable\b", "looks normal", PHRASE),
    (r"\bappear unremarkable\b", "look normal", PHRASE),
    (r"\bis normal\b", "looks normal", PHRASE),
    (r"\bare normal\b", "look normal", PHRASE),
    (r"\bwithin normal limits\b", "normal", PHRASE),
    (r"\bno acute abnormality\b", "nothing urgent", PHRASE),
    (r"\bextra[- ]?axial\b", "outside the brain surface", PHRASE),
    (r"\bperilesional o?edema\b", "swelling around the spot", PHRASE),
    (r"\bsubfalcine herniation\b", "pressure pushing brain tissue under the middle fold", PHRASE),
    (r"\bpleural effusions?\b", "fluid around the lung", PHRASE),
    (r"\bdegenerative changes?\b", "wear-and-tear changes", PHRASE),
    (r"\bintra[- ]?abdominal\b", "inside the belly", PHRASE),
    // Clinical terms
    (r"\bunremarkable\b", "looks normal", TERM),
    (r"\bhepatomegaly\b", "enlarged liver", TERM),
    (r"\bsplenomegaly\b", "enlarged spleen", TERM),
    (r"\bcardiomegaly\b", "enlarged heart", TERM),
    (r"\bsymmetric(?:al)?\b", "same on both sides", TERM),
    (r"\bbenign\b", "not dangerous", TERM),
    (r"\b(?:lymph)?adenopathy\b", "swollen lymph nodes", TERM),
    (r"\bnecrotic\b", "dead tissue", TERM),
    (r"\bnecrosis\b", "tissue death", TERM),
    (r"\bmetastas[ie]s\b", "spread to other areas", TERM),
    (r"\bmetastatic\b", "spreading", TERM),
    (r"\binvasion\b", "growth into nearby tissue", TERM),
    (r"\bcompression\b", "pressure on nearby parts", TERM),
    (r"\bperforation\b", "a hole or tear", TERM),
    (r"\bischa?emia\b", "low blood flow", TERM),
    (r"\bdilat(?:at)?ion\b", "widening", TERM),
    (r"\bdilated\b", "widened", TERM),
    (r"\bstenosis\b", "narrowing", TERM),
    (r"\bthrombo(?:sis|us)\b", "blood clot", TERM),
    (r"\baneurysm\b", "bulging blood vessel", TERM),
    (r"\bhae?morrhage\b", "bleeding", TERM),
    (r"\bhae?matoma\b", "collection of blood", TERM),
    (r"\bo?edema\b", "swelling", TERM),
    (r"\beffusions?\b", "fluid build-up", TERM),
    (r"\bhydronephrosis\b", "swelling of the kidney from trapped urine", TERM),
    (r"\bnephrolithiasis\b", "kidney stones", TERM),
    (r"\bcholelithiasis\b", "gallstones", TERM),
    (r"\bcalculi\b", "stones", TERM),
    (r"\bcalculus\b", "stone", TERM),
    (r"\bnodules\b", "small lumps", TERM),
    (r"\bnodule\b", "small lump", TERM),
    (r"\bopacities\b", "cloudy areas", TERM),
    (r"\bopacity\b", "cloudy area", TERM),
    (r"\bconsolidation\b", "solid-looking lung area", TERM),
    (r"\batelectasis\b", "partly collapsed lung", TERM),
    (r"\bspondylosis\b", "wear-and-tear of the spine", TERM),
    (r"\bosteophytes?\b", "bone spurs", TERM),
    (r"\bcalcifications?\b", "calcium deposits", TERM),
    (r"\bhypodense\b", "darker-looking", TERM),
    (r"\bhyperdense\b", "brighter-looking", TERM),
    (r"\bhypoechoic\b", "darker on ultrasound", TERM),
    (r"\bhyperechoic\b", "brighter on ultrasound", TERM),
    (r"\bintracranial\b", "inside the skull", TERM),
    // Plain-word swaps
    (r"\bbilateral\b", "on both sides", WORD),
    (r"\bunilateral\b", "on one side", WORD),
    (r"\brenal\b", "kidney", WORD),
    (r"\bhepatic\b", "liver", WORD),
    (r"\bpulmonary\b", "lung", WORD),
    (r"\bcardiac\b", "heart", WORD),
    (r"\bcerebral\b", "brain", WORD),
    (r"\bosseous\b", "bone", WORD),
    (r"\bintact\b", "normal", WORD),
];

pub struct Rule {
    pub pattern: Regex,
    pub replacement: &'static str,
    pub priority: u8,
}

/// Compiled table in application order.
pub static COMPILED_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let mut ordered: Vec<&(&str, &str, u8)> = RULES.iter().collect();
    ordered.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.0.len().cmp(&a.0.len())));
    ordered
        .into_iter()
        .map(|(pattern, replacement, priority)| Rule {
            pattern: RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("valid regex"),
            replacement: *replacement,
            priority: *priority,
        })
        .collect()
});

/// Apply every rule in order.
pub fn apply_rules(text: &str) -> String {
    let mut out = text.to_string();
    for rule in COMPILED_RULES.iter() {
        if rule.pattern.is_match(&out) {
            out = rule.pattern.replace_all(&out, rule.replacement).into_owned();
        }
    }
    out
}
