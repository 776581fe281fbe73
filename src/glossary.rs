//! Two-column lay-term glossary loaded from CSV.
//!
//! Loaded once at startup and read-only afterwards. A missing or malformed
//! file degrades to the empty glossary, which substitutes nothing.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlossaryError {
    #[error("Glossary I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Glossary CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Glossary pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Header rows recognized (and skipped) on the first line.
const KNOWN_HEADERS: &[(&str, &str)] = &[("en", "sw"), ("from", "to")];

/// Compiled alternations grow with the glossary; allow more than the regex default.
const PATTERN_SIZE_LIMIT: usize = 64 * (1 << 20);

#[derive(Debug, Clone, Default)]
pub struct Glossary {
    mapping: HashMap<String, String>,
    /// Keys longest first; the order the alternation is built in.
    keys: Vec<String>,
    pattern: Option<Regex>,
}

impl Glossary {
    /// Load from a CSV file. Failures are logged and yield the empty glossary.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(glossary) => {
                tracing::info!(entries = glossary.len(), "Glossary loaded");
                glossary
            }
            Err(e) => {
                tracing::warn!(error = %e, "Glossary unavailable, continuing without it");
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, GlossaryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse two-column CSV rows. Rows with fewer than two columns are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GlossaryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut pairs = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() < 2 {
                continue;
            }
            let (from, to) = (&record[0], &record[1]);
            if index == 0 && is_header(from, to) {
                continue;
            }
            pairs.push((from.to_string(), to.to_string()));
        }
        Self::try_from_pairs(pairs)
    }

    /// Build from in-memory pairs. Keys are lower-cased; later duplicates win.
    pub fn try_from_pairs<I, K, V>(pairs: I) -> Result<Self, GlossaryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut mapping = HashMap::new();
        for (key, value) in pairs {
            let key = key.as_ref().trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            mapping.insert(key, value.as_ref().trim().to_string());
        }

        let mut keys: Vec<String> = mapping.keys().cloned().collect();
        keys.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));

        let pattern = if keys.is_empty() {
            None
        } else {
            let alternation = keys
                .iter()
                .map(|k| bounded_literal(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                RegexBuilder::new(&alternation)
                    .case_insensitive(true)
                    .size_limit(PATTERN_SIZE_LIMIT)
                    .build()?,
            )
        };

        Ok(Self { mapping, keys, pattern })
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn get(&self, term: &str) -> Option<&str> {
        self.mapping.get(&term.to_lowercase()).map(String::as_str)
    }

    /// Keys, longest first.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Replace every glossary term in one left-to-right pass.
    pub fn replace_terms(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };
        pattern
            .replace_all(text, |caps: &regex::Captures| {
                let matched = &caps[0];
                self.mapping
                    .get(&matched.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| matched.to_string())
            })
            .into_owned()
    }
}

fn is_header(from: &str, to: &str) -> bool {
    KNOWN_HEADERS
        .iter()
        .any(|(a, b)| from.eq_ignore_ascii_case(a) && to.eq_ignore_ascii_case(b))
}

/// Escape a literal and add `\b` on the sides that start or end with a word char.
pub(crate) fn bounded_literal(literal: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = literal.chars().next().is_some_and(is_word);
    let tail = literal.chars().last().is_some_and(is_word);
    format!(
        "{}{}{}",
        if lead { r"\b" } else { "" },
        regex::escape(literal),
        if tail { r"\b" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_csv_with_header() {
        let csv = "en,sw\nHepatomegaly,enlarged liver\nrenal cyst,fluid sac in the kidney\n";
        let g = Glossary::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.get("hepatomegaly"), Some("enlarged liver"));
        assert_eq!(g.get("HEPATOMEGALY"), Some("enlarged liver"));
    }

    #[test]
    fn from_to_header_is_skipped_case_insensitively() {
        let g = Glossary::from_reader("From,To\nbenign,harmless\n".as_bytes()).unwrap();
        assert_eq!(g.len(), 1);
        assert!(g.get("from").is_none());
    }

    #[test]
    fn short_rows_are_ignored() {
        let csv = "solo\nedema,swelling,extra column\n\n";
        let g = Glossary::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(g.len(), 1);
        assert_eq!(g.get("edema"), Some("swelling"));
    }

    #[test]
    fn longer_keys_win() {
        let g = Glossary::try_from_pairs([("cyst", "fluid sac"), ("renal cyst", "kidney fluid sac")])
            .unwrap();
        assert_eq!(g.keys()[0], "renal cyst");
        assert_eq!(
            g.replace_terms("A renal cyst and a liver cyst."),
            "A kidney fluid sac and a liver fluid sac."
        );
    }

    #[test]
    fn replacement_is_single_pass() {
        let g = Glossary::try_from_pairs([("a1", "b1"), ("b1", "c1")]).unwrap();
        assert_eq!(g.replace_terms("a1 b1"), "b1 c1");
    }

    #[test]
    fn whole_words_only() {
        let g = Glossary::try_from_pairs([("mass", "lump")]).unwrap();
        assert_eq!(g.replace_terms("Massive mass."), "Massive lump.");
    }

    #[test]
    fn empty_glossary_is_identity() {
        let g = Glossary::default();
        assert!(g.is_empty());
        assert_eq!(g.replace_terms("Unchanged text."), "Unchanged text.");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hepatomegaly,enlarged liver").unwrap();
        let g = Glossary::load(file.path());
        assert_eq!(g.get("hepatomegaly"), Some("enlarged liver"));
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let g = Glossary::load(Path::new("/nonexistent/glossary.csv"));
        assert!(g.is_empty());
        assert!(matches!(
            Glossary::try_load(Path::new("/nonexistent/glossary.csv")),
            Err(GlossaryError::Io(_))
        ));
    }

    #[test]
    fn bounded_literal_skips_boundary_on_symbols() {
        let hyphenated = Regex::new(&bounded_literal("c-spine")).unwrap();
        assert!(hyphenated.is_match("the c-spine is straight"));
        assert!(!hyphenated.is_match("abc-spines"));
        let symbol = Regex::new(&bounded_literal("(r)")).unwrap();
        assert!(symbol.is_match("left(r)"));
    }
}
