//! Cleanup after substitution: filler phrases, articles, repeats, spacing, case.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[ \t]+(?:(?:is|are)[ \t]+(?:noted|seen)|is[ \t]+identified)\b").expect("valid regex")
});

static A_BEFORE_VOWEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([Aa])[ \t]+([aeio][a-z]*)\b").expect("valid regex"));

static AN_BEFORE_CONSONANT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([Aa])n[ \t]+([b-df-gj-np-tv-z][a-z]*)\b").expect("valid regex")
});

static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.;:!?)\]])").expect("valid regex"));
static SPACE_AFTER_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([(\[])\s+").expect("valid regex"));
static COMMA_BEFORE_STOP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",+\s*([.;!?])").expect("valid regex"));
static REPEATED_STOP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.;,])[.;,]+").expect("valid regex"));

/// Acronyms restored after an all-caps sentence is lowered.
static ACRONYM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ct|mri|mr|usg|hu|csf|iv|ecg|pet|dwi|adc|flair|t1|t2|cbd|ivc|l[1-5]|c[1-7]|t1[0-2]|s1)\b")
        .expect("valid regex")
});

/// Drop "is noted", "are seen", "is identified" and similar filler.
pub fn drop_filler(text: &str) -> String {
    FILLER_RE.replace_all(text, "").into_owned()
}

/// "a enlarged" -> "an enlarged", "an small" -> "a small". Lower-case words only.
/// A capital article is only touched at a sentence start, so labels such as
/// "Type A" or "Vitamin A" stay as written.
pub fn fix_articles(text: &str) -> String {
    let fixed = A_BEFORE_VOWEL_RE.replace_all(text, |caps: &Captures| {
        let word = &caps[2];
        if word.starts_with("one") || word.starts_with("once") || !is_article(text, caps) {
            caps[0].to_string()
        } else {
            format!("{}n {}", &caps[1], word)
        }
    });
    AN_BEFORE_CONSONANT_RE
        .replace_all(&fixed, |caps: &Captures| {
            if is_article(&fixed, caps) {
                format!("{} {}", &caps[1], &caps[2])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn is_article(text: &str, caps: &Captures) -> bool {
    let Some(whole) = caps.get(0) else { return false };
    if &caps[1] == "a" {
        return true;
    }
    let before = text[..whole.start()].trim_end();
    before.is_empty() || before.ends_with(['.', '!', '?', ':', ';', '\n'])
}

/// Remove a word repeated back to back ("the the").
pub fn drop_repeated_words(text: &str) -> String {
    let mut kept: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        let core = token.trim_end_matches(|c: char| !c.is_alphanumeric());
        if let Some(prev) = kept.last_mut() {
            let prev_is_word = !prev.is_empty() && prev.chars().all(char::is_alphabetic);
            let core_is_word = !core.is_empty() && core.chars().all(char::is_alphabetic);
            if prev_is_word && core_is_word && prev.eq_ignore_ascii_case(core) {
                // Keep the repeat's trailing punctuation.
                prev.push_str(&token[core.len()..]);
                continue;
            }
        }
        kept.push(token.to_string());
    }
    kept.join(" ")
}

/// Collapse whitespace and tidy spacing around punctuation.
pub fn fix_spacing(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let s = SPACE_BEFORE_PUNCT_RE.replace_all(&collapsed, "$1");
    let s = SPACE_AFTER_OPEN_RE.replace_all(&s, "$1");
    let s = COMMA_BEFORE_STOP_RE.replace_all(&s, "$1");
    let s = REPEATED_STOP_RE.replace_all(&s, "$1");
    s.trim().to_string()
}

/// Lower an all-caps sentence, restoring known acronyms.
pub fn lower_shouting(sentence: &str) -> String {
    let letters: Vec<char> = sentence.chars().filter(|c| c.is_alphabetic()).collect();
    let shouting = letters.len() >= 4 && letters.iter().all(|c| c.is_uppercase());
    if !shouting {
        return sentence.to_string();
    }
    let lowered = sentence.to_lowercase();
    ACRONYM_RE
        .replace_all(&lowered, |caps: &Captures| caps[0].to_uppercase())
        .into_owned()
}

pub fn capitalize_first(sentence: &str) -> String {
    let mut out = sentence.to_string();
    if let Some(first) = out.chars().next() {
        if first.is_lowercase() {
            let upper: String = first.to_uppercase().collect();
            out.replace_range(..first.len_utf8(), &upper);
        }
    }
    out
}

/// Sentence case: lower all-caps sentences (keeping acronyms), upper-case the first letter.
pub fn fix_capitalization(sentence: &str) -> String {
    capitalize_first(&lower_shouting(sentence))
}
