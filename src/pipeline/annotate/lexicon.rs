//! Curated vocabularies for polarity highlighting and tooltips.
//!
//! Patterns are matched against already-simplified lay text, so both the
//! clinical word and its plain replacement are listed where they differ.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// A compiled lexicon pattern with an optional plain-language definition.
pub struct LexiconEntry {
    pub regex: Regex,
    pub definition: Option<&'static str>,
}

fn entry(pattern: &str, definition: Option<&'static str>) -> LexiconEntry {
    LexiconEntry {
        regex: RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("valid regex"),
        definition,
    }
}

/// Concerning terms, highlighted red.
pub static NEGATIVE_TERMS: LazyLock<Vec<LexiconEntry>> = LazyLock::new(|| {
    [
        (r"\bmass(?:es)?\b", Some("an abnormal lump")),
        (r"\btumou?rs?\b", Some("a growth that forms a lump")),
        (r"\bcancer(?:s|ous)?\b", Some("a harmful growth that can spread")),
        (r"\blesions?\b", Some("an abnormal spot or area")),
        (r"\bswollen lymph nodes\b", Some("lymph nodes that are bigger than normal")),
        (r"\benlarged\b", Some("bigger than normal")),
        (r"\bdead tissue\b", Some("tissue that has died")),
        (r"\bspread(?:ing)? to other areas\b", Some("spread to other areas")),
        (r"\bspreading\b", Some("spreading to other areas")),
        (r"\bobstruction\b", Some("a blockage")),
        (r"\bblockages?\b", None),
        (r"\bpressure on nearby parts\b", Some("being pressed")),
        (r"\bgrowth into nearby tissues?\b", Some("growing into nearby tissues")),
        (r"\ba hole or tear\b", None),
        (r"\blow blood flow\b", None),
        (r"\bfractures?\b", Some("a broken bone")),
        (r"\bbroken bones?\b", None),
        (r"\bbleed(?:ing)?\b", None),
        (r"\bcollection of blood\b", Some("blood pooled outside a vessel")),
        (r"\bblood clots?\b", Some("a clump of blood that can block a vessel")),
        (r"\bnarrowing\b", Some("a tube or vessel that is tighter than normal")),
        (r"\bwiden(?:ed|ing)\b", Some("wider than normal")),
        (r"\bbulging blood vessel\b", None),
        (r"\bswelling\b", None),
        (r"\bswollen\b", Some("bigger or puffier than normal")),
        (r"\bfluid build-up\b", Some("extra fluid collecting where it should not")),
        (r"\bfluid around the lung\b", None),
        (r"\bhydroureteronephrosis\b", Some("swelling of kidney and ureter from blockage")),
        (r"\bobstructing\b", Some("causing a blockage")),
        (r"\babscess\b", Some("a pocket of pus")),
        (r"\bsmall lumps?\b", None),
        (r"\blumps?\b", None),
        (r"\babnormal(?:ity|ities)?\b", None),
        (r"\bappendicitis\b", Some("an inflamed appendix")),
        (r"\bherniation\b", Some("tissue pushing out of its normal place")),
    ]
    .into_iter()
    .map(|(pattern, definition)| entry(pattern, definition))
    .collect()
});

/// Reassuring terms, highlighted green.
pub static POSITIVE_TERMS: LazyLock<Vec<LexiconEntry>> = LazyLock::new(|| {
    [
        r"\blooks? normal\b",
        r"\bappears? normal\b",
        r"\bnormal\b",
        r"\bclear\b",
        r"\bstable\b",
        r"\bimproved\b",
        r"\bnot dangerous\b",
        r"\bsame on both sides\b",
        r"\bnothing urgent\b",
    ]
    .into_iter()
    .map(|pattern| entry(pattern, None))
    .collect()
});

/// "no X" / "without X" with up to three trailing words.
pub static NEGATION_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:no|without)\s+[a-z][a-z\-]*(?:\s+[a-z][a-z\-]*){0,2}")
        .expect("valid regex")
});

/// Cues that turn a sentence holding a concerning term reassuring.
pub static NEGATION_CUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:no|not|without|negative for|free of|ruled out)\b").expect("valid regex")
});

/// Anatomy and terminology explained on hover.
pub static TOOLTIP_TERMS: LazyLock<Vec<LexiconEntry>> = LazyLock::new(|| {
    [
        (r"\bnasopharynx\b", "the back of the nose"),
        (r"\blarynx\b", "the voice box"),
        (r"\bpalatine tonsils\b", "the tonsils"),
        (r"\blingual tonsils?\b", "tonsil tissue at the base of the tongue"),
        (r"\bparanasal sinuses\b", "air pockets in the face"),
        (r"\bcraniocervical junction\b", "where the skull meets the neck"),
        (r"\bparotid\b", "a saliva gland in front of the ear"),
        (r"\bsubmandibular\b", "a saliva gland under the jaw"),
        (r"\bcarotid\b", "a large artery in the neck"),
        (r"\bjugular\b", "a large vein in the neck"),
        (r"\bthyroid\b", "a gland in the neck that controls metabolism"),
        (r"\bfronto[- ]?parietal\b", "the front-top area of the brain"),
        (r"\bsphenoid wing\b", "a bone near the temple"),
        (r"\bmeninges\b", "the brain's lining"),
        (r"\bmeningioma\b", "a tumor from the brain's lining"),
        (r"\bventricles?\b", "fluid-filled spaces inside the brain"),
        (r"\bureters?\b", "the tubes that carry urine from the kidneys"),
        (r"\bmediastinum\b", "the space in the chest between the lungs"),
        (r"\bpancreas\b", "an organ behind the stomach that helps digestion"),
        (r"\bspleen\b", "an organ that filters blood"),
        (r"\bgall\s?bladder\b", "a small sac that stores bile"),
        (r"\bappendix\b", "a small pouch attached to the bowel"),
        (r"\bvertebrae?\b", "the bones of the spine"),
        (r"\bcontrast dye\b", "a dye that makes some tissues show up more clearly"),
        (r"\baxial\b", "slices from top to bottom"),
        (r"\bcoronal\b", "slices from front to back"),
        (r"\bsagittal\b", "slices from side to side"),
        (r"\bbrain window\b", "a display setting that shows brain tissue clearly"),
    ]
    .into_iter()
    .map(|(pattern, definition)| entry(pattern, Some(definition)))
    .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicons_compile() {
        assert!(!NEGATIVE_TERMS.is_empty());
        assert!(!POSITIVE_TERMS.is_empty());
        assert!(TOOLTIP_TERMS.iter().all(|e| e.definition.is_some()));
    }

    #[test]
    fn negation_phrase_takes_up_to_three_words() {
        let m = NEGATION_PHRASE_RE
            .find("There is no mass or lesion seen here.")
            .unwrap();
        assert_eq!(m.as_str(), "no mass or lesion");
    }
}
