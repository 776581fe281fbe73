//! Polarity highlighting and term tooltips, rendered as HTML fragments.
//!
//! Works one sentence at a time. The polarity pass runs first; tooltips are
//! only placed in the plain text left between polarity markup. Every piece of
//! report text is escaped before it is emitted.

pub mod lexicon;

use crate::pipeline::text::{collapse_whitespace, escape_html, split_sentences};

use lexicon::{
    LexiconEntry, NEGATION_CUE_RE, NEGATION_PHRASE_RE, NEGATIVE_TERMS, POSITIVE_TERMS,
    TOOLTIP_TERMS,
};

/// CSS marker for reassuring highlights.
pub const POSITIVE_CLASS: &str = r#"class="positive""#;
/// CSS marker for concerning highlights.
pub const NEGATIVE_CLASS: &str = r#"class="negative""#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Positive,
    Negative,
    Term,
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    mark: Mark,
    definition: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Plain(String),
    Markup(String),
}

/// Stateless renderer over the built-in lexicons.
#[derive(Debug, Default, Clone, Copy)]
pub struct Annotator;

impl Annotator {
    pub fn new() -> Self {
        Self
    }

    /// Polarity highlighting plus tooltips.
    pub fn annotate(&self, text: &str) -> String {
        split_sentences(text)
            .iter()
            .map(|sentence| render(&add_tooltips(highlight_sentence(sentence))))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Tooltips only, for descriptive fields that carry no polarity.
    pub fn annotate_terms(&self, text: &str) -> String {
        let flat = collapse_whitespace(text);
        render(&add_tooltips(vec![Segment::Plain(flat)]))
    }
}

/// Number of reassuring and concerning highlights in rendered HTML.
pub fn count_highlights(html: &str) -> (usize, usize) {
    (
        html.matches(POSITIVE_CLASS).count(),
        html.matches(NEGATIVE_CLASS).count(),
    )
}

fn highlight_sentence(sentence: &str) -> Vec<Segment> {
    let negatives = find_spans(&NEGATIVE_TERMS, sentence, Mark::Negative);

    // A concerning term next to a negation or a reassuring word: the sentence reassures.
    let reassured = !negatives.is_empty()
        && (NEGATION_CUE_RE.is_match(sentence)
            || POSITIVE_TERMS.iter().any(|entry| entry.regex.is_match(sentence)));
    if reassured {
        return vec![Segment::Markup(wrap(Mark::Positive, None, sentence))];
    }

    let mut spans = negatives;
    spans.extend(find_spans(&POSITIVE_TERMS, sentence, Mark::Positive));
    spans.extend(NEGATION_PHRASE_RE.find_iter(sentence).map(|m| Span {
        start: m.start(),
        end: m.end(),
        mark: Mark::Positive,
        definition: None,
    }));
    split_by_spans(sentence, resolve_overlaps(spans))
}

fn add_tooltips(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            Segment::Plain(text) => {
                let spans = resolve_overlaps(find_spans(&TOOLTIP_TERMS, &text, Mark::Term));
                out.extend(split_by_spans(&text, spans));
            }
            markup => out.push(markup),
        }
    }
    out
}

fn find_spans(entries: &[LexiconEntry], text: &str, mark: Mark) -> Vec<Span> {
    entries
        .iter()
        .flat_map(|entry| {
            entry.regex.find_iter(text).map(move |m| Span {
                start: m.start(),
                end: m.end(),
                mark,
                definition: entry.definition,
            })
        })
        .collect()
}

/// Earliest start wins, then the longest match; later overlapping spans are dropped.
fn resolve_overlaps(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| (b.end - b.start).cmp(&(a.end - a.start)))
    });
    let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.last().map_or(true, |last| span.start >= last.end) {
            kept.push(span);
        }
    }
    kept
}

fn split_by_spans(text: &str, spans: Vec<Span>) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for span in spans {
        if span.start > cursor {
            segments.push(Segment::Plain(text[cursor..span.start].to_string()));
        }
        segments.push(Segment::Markup(wrap(
            span.mark,
            span.definition,
            &text[span.start..span.end],
        )));
        cursor = span.end;
    }
    if cursor < text.len() {
        segments.push(Segment::Plain(text[cursor..].to_string()));
    }
    segments
}

fn wrap(mark: Mark, definition: Option<&str>, text: &str) -> String {
    let body = escape_html(text);
    match (mark, definition) {
        (Mark::Positive, _) => format!("<strong {POSITIVE_CLASS}>{body}</strong>"),
        (Mark::Negative, Some(def)) => format!(
            "<strong {NEGATIVE_CLASS} data-def=\"{}\">{body}</strong>",
            escape_html(def)
        ),
        (Mark::Negative, None) => format!("<strong {NEGATIVE_CLASS}>{body}</strong>"),
        (Mark::Term, def) => format!(
            "<span class=\"term\" data-tooltip=\"{}\">{body}</span>",
            escape_html(def.unwrap_or_default())
        ),
    }
}

fn render(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Plain(text) => escape_html(text),
            Segment::Markup(html) => html.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotate(text: &str) -> String {
        Annotator::new().annotate(text)
    }

    #[test]
    fn negated_concern_becomes_positive_sentence() {
        assert_eq!(
            annotate("No mass or lesion seen."),
            r#"<strong class="positive">No mass or lesion seen.</strong>"#
        );
    }

    #[test]
    fn longest_positive_phrase_wins() {
        assert_eq!(
            annotate("Liver looks normal."),
            r#"Liver <strong class="positive">looks normal</strong>."#
        );
    }

    #[test]
    fn concerning_term_carries_definition() {
        assert_eq!(
            annotate("There is a 3 cm mass."),
            r#"There is a 3 cm <strong class="negative" data-def="an abnormal lump">mass</strong>."#
        );
    }

    #[test]
    fn concern_with_any_negation_becomes_positive_sentence() {
        assert_eq!(
            annotate("Mass with no bleeding."),
            r#"<strong class="positive">Mass with no bleeding.</strong>"#
        );
        assert_eq!(
            annotate("A blood clot is present with no bleeding."),
            r#"<strong class="positive">A blood clot is present with no bleeding.</strong>"#
        );
    }

    #[test]
    fn concern_with_reassuring_word_becomes_positive_sentence() {
        let html = annotate("Stable mass.");
        assert_eq!(html, r#"<strong class="positive">Stable mass.</strong>"#);
        assert_eq!(count_highlights(&html), (1, 0));
    }

    #[test]
    fn negation_phrase_without_concern_is_positive() {
        assert_eq!(
            annotate("No free fluid."),
            r#"<strong class="positive">No free fluid</strong>."#
        );
    }

    #[test]
    fn tooltips_fill_plain_text_only() {
        assert_eq!(
            annotate("The carotid artery is clear."),
            r#"The <span class="term" data-tooltip="a large artery in the neck">carotid</span> artery is <strong class="positive">clear</strong>."#
        );
    }

    #[test]
    fn definitions_and_text_are_escaped() {
        let html = Annotator::new().annotate_terms("Meninges <b>thick</b> & fine");
        assert_eq!(
            html,
            r#"<span class="term" data-tooltip="the brain&#39;s lining">Meninges</span> &lt;b&gt;thick&lt;/b&gt; &amp; fine"#
        );
    }

    #[test]
    fn multiword_term_is_one_highlight() {
        let html = annotate("Swollen lymph nodes in the neck.");
        assert_eq!(count_highlights(&html), (0, 1));
        assert!(html.contains(">Swollen lymph nodes</strong>"));
    }

    #[test]
    fn empty_text_renders_empty() {
        assert_eq!(annotate(""), "");
        assert_eq!(Annotator::new().annotate_terms("  "), "");
    }

    #[test]
    fn counts_both_polarities() {
        let html = annotate("Kidneys look normal. Small stone? No. A fracture of the rib.");
        assert_eq!(count_highlights(&html), (1, 1));
    }
}
