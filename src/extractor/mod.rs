//! # Alignment-Aware Token Extraction
//!
//! Walks a [`ParsedVerse`] depth-first and produces the verse's
//! [`WordToken`]s in document order:
//!
//! * `span` comes from a running character cursor over the verse's rendered
//!   text, so concatenating all tokens reproduces it exactly;
//! * `occurrence` comes from an [`OccurrenceCounter`] keyed by normalized
//!   content and is independent of alignment;
//! * words inside alignment milestones carry the innermost milestone's
//!   [`AlignmentAttributes`].
//!
//! The computed occurrence is authoritative for identity. A declared
//! occurrence that disagrees is kept on the token and reported as a
//! [`DiagnosticKind::OccurrenceMismatch`].

pub mod context;
pub mod occurrence;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    config::ExtractionConfig,
    diagnostics::{Diagnostic, DiagnosticKind},
    tokenizer::{Attributes, MarkupNode, ParsedVerse, TokenizerError, WordNode},
    verse_ref::VerseRef,
};

pub use context::AlignmentContext;
pub use occurrence::{normalize_content, OccurrenceCounter};

/// Half-open character range into a verse's rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Source-language data from the enclosing alignment milestone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AlignmentAttributes {
    pub strong: Option<String>,
    pub lemma: Option<String>,
    pub morph: Option<String>,
    pub source_content: Option<String>,
    pub source_occurrence: Option<u32>,
    pub source_occurrences: Option<u32>,
}

impl From<&Attributes> for AlignmentAttributes {
    fn from(attributes: &Attributes) -> Self {
        Self {
            strong: attributes.strong().map(str::to_string),
            lemma: attributes.lemma().map(str::to_string),
            morph: attributes.morph().map(str::to_string),
            source_content: attributes.content().map(str::to_string),
            source_occurrence: attributes.occurrence(),
            source_occurrences: attributes.occurrences(),
        }
    }
}

/// Lexical attributes a word carries itself, as original-language texts do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WordAttributes {
    pub strong: Option<String>,
    pub lemma: Option<String>,
    pub morph: Option<String>,
}

impl WordAttributes {
    fn from_attributes(attributes: &Attributes) -> Option<Self> {
        let word = Self {
            strong: attributes.strong().map(str::to_string),
            lemma: attributes.lemma().map(str::to_string),
            morph: attributes.morph().map(str::to_string),
        };
        if word.strong.is_none() && word.lemma.is_none() && word.morph.is_none() {
            None
        } else {
            Some(word)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordToken {
    /// `<verseRef>:<content>:<occurrence>`.
    pub unique_id: String,
    pub content: String,
    /// Computed, 1-based. `0` for non-highlightable tokens.
    pub occurrence: u32,
    /// Computed number of instances of this content in the verse.
    pub occurrences: u32,
    pub declared_occurrence: Option<u32>,
    pub declared_occurrences: Option<u32>,
    pub verse_ref: VerseRef,
    pub span: TextSpan,
    pub is_highlightable: bool,
    pub alignment: Option<AlignmentAttributes>,
    pub word_attributes: Option<WordAttributes>,
}

pub fn unique_id(verse_ref: &VerseRef, content: &str, occurrence: u32) -> String {
    format!("{}:{}:{}", verse_ref, content, occurrence)
}

impl WordToken {
    pub fn is_aligned(&self) -> bool {
        self.alignment.is_some()
    }
}

/// Everything extracted from one verse. Rebuilt wholesale on every parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerseExtraction {
    pub verse_ref: VerseRef,
    /// Words and separators, in span order.
    pub tokens: Vec<WordToken>,
    pub plain_text: String,
    /// Milestones that enclosed no renderable word.
    pub empty_alignments: Vec<AlignmentAttributes>,
    pub diagnostics: Vec<Diagnostic>,
    pub parse_error: Option<TokenizerError>,
}

impl VerseExtraction {
    pub fn highlightable(&self) -> impl Iterator<Item = &WordToken> {
        self.tokens.iter().filter(|t| t.is_highlightable)
    }

    pub fn token(&self, unique_id: &str) -> Option<&WordToken> {
        self.tokens
            .iter()
            .find(|t| t.is_highlightable && t.unique_id == unique_id)
    }

    pub fn has_error(&self) -> bool {
        self.parse_error.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractionConfig,
}

/// Mutable state of one extraction pass.
struct Walk<'a> {
    verse_ref: &'a VerseRef,
    cursor: usize,
    counter: OccurrenceCounter,
    tokens: Vec<WordToken>,
    /// Highlightable tokens pushed so far.
    words: usize,
    plain_text: String,
    empty_alignments: Vec<AlignmentAttributes>,
    diagnostics: Vec<Diagnostic>,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    #[tracing::instrument(level = "debug", skip(self, parsed), fields(verse = %verse_ref))]
    pub fn extract(&self, verse_ref: &VerseRef, parsed: &ParsedVerse) -> VerseExtraction {
        let mut walk = Walk {
            verse_ref,
            cursor: 0,
            counter: OccurrenceCounter::new(),
            tokens: Vec::new(),
            words: 0,
            plain_text: String::new(),
            empty_alignments: Vec::new(),
            diagnostics: Vec::new(),
        };
        let mut context = AlignmentContext::new();
        walk.visit(&parsed.nodes, &mut context);

        for token in walk.tokens.iter_mut().filter(|t| t.is_highlightable) {
            token.occurrences = walk.counter.total(&token.content);
        }
        if self.config.check_declared_totals {
            walk.check_declared_totals();
        }
        if let Some(error) = &parsed.error {
            walk.diagnostics.push(Diagnostic::new(
                verse_ref,
                DiagnosticKind::Parse {
                    error: error.clone(),
                },
            ));
        }

        tracing::debug!(
            "extracted {} tokens, {} diagnostics",
            walk.tokens.len(),
            walk.diagnostics.len()
        );

        VerseExtraction {
            verse_ref: verse_ref.clone(),
            tokens: walk.tokens,
            plain_text: walk.plain_text,
            empty_alignments: walk.empty_alignments,
            diagnostics: walk.diagnostics,
            parse_error: parsed.error.clone(),
        }
    }
}

impl Walk<'_> {
    fn visit(&mut self, nodes: &[MarkupNode], context: &mut AlignmentContext) {
        for node in nodes {
            match node {
                MarkupNode::Text { text } => self.push_separator(text),
                MarkupNode::Word(word) => self.push_word(word, context),
                MarkupNode::AlignmentMilestone(milestone) => {
                    let attributes = AlignmentAttributes::from(&milestone.attributes);
                    let words_before = self.words;
                    context.push(attributes);
                    self.visit(&milestone.children, context);
                    let attributes = context.pop().unwrap_or_default();
                    if self.words == words_before {
                        self.record_empty_alignment(attributes);
                    }
                }
            }
        }
    }

    fn advance(&mut self, text: &str) -> TextSpan {
        let start = self.cursor;
        self.cursor += text.chars().count();
        self.plain_text.push_str(text);
        TextSpan {
            start,
            end: self.cursor,
        }
    }

    fn push_separator(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let span = self.advance(text);
        self.tokens.push(WordToken {
            unique_id: unique_id(self.verse_ref, text, 0),
            content: text.to_string(),
            occurrence: 0,
            occurrences: 0,
            declared_occurrence: None,
            declared_occurrences: None,
            verse_ref: self.verse_ref.clone(),
            span,
            is_highlightable: false,
            alignment: None,
            word_attributes: None,
        });
    }

    fn push_word(&mut self, word: &WordNode, context: &AlignmentContext) {
        if normalize_content(&word.content).is_empty() {
            self.push_separator(&word.content);
            return;
        }

        let span = self.advance(&word.content);
        let occurrence = self.counter.next(&word.content);
        let declared_occurrence = word.attributes.occurrence();

        if let Some(declared) = declared_occurrence {
            if declared != occurrence {
                self.diagnostics.push(Diagnostic::new(
                    self.verse_ref,
                    DiagnosticKind::OccurrenceMismatch {
                        content: word.content.clone(),
                        declared,
                        computed: occurrence,
                    },
                ));
            }
        }

        self.tokens.push(WordToken {
            unique_id: unique_id(self.verse_ref, &word.content, occurrence),
            content: word.content.clone(),
            occurrence,
            occurrences: 0,
            declared_occurrence,
            declared_occurrences: word.attributes.occurrences(),
            verse_ref: self.verse_ref.clone(),
            span,
            is_highlightable: true,
            alignment: context.innermost().cloned(),
            word_attributes: WordAttributes::from_attributes(&word.attributes),
        });
        self.words += 1;
    }

    fn record_empty_alignment(&mut self, attributes: AlignmentAttributes) {
        self.diagnostics.push(Diagnostic::new(
            self.verse_ref,
            DiagnosticKind::EmptyAlignment {
                source_content: attributes.source_content.clone(),
                strong: attributes.strong.clone(),
            },
        ));
        self.empty_alignments.push(attributes);
    }

    fn check_declared_totals(&mut self) {
        let mut reported = HashSet::new();
        let mut findings = Vec::new();
        for token in self.tokens.iter().filter(|t| t.is_highlightable) {
            let Some(declared) = token.declared_occurrences else {
                continue;
            };
            if declared != token.occurrences && reported.insert(normalize_content(&token.content))
            {
                findings.push(DiagnosticKind::OccurrencesTotalMismatch {
                    content: token.content.clone(),
                    declared,
                    computed: token.occurrences,
                });
            }
        }
        for kind in findings {
            self.diagnostics.push(Diagnostic::new(self.verse_ref, kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Tokenizer;
    use pretty_assertions::assert_eq;

    fn extract(markup: &str) -> VerseExtraction {
        let parsed = Tokenizer::new().tokenize(markup);
        Extractor::default().extract(&VerseRef::new("RUT", 1, "1"), &parsed)
    }

    fn milestone(strong: &str, lemma: &str, content: &str, words: &str) -> String {
        format!(
            r#"\zaln-s |x-strong="{}" x-lemma="{}" x-morph="Gr,N" x-occurrence="1" x-occurrences="1" x-content="{}"\*{}\zaln-e\*"#,
            strong, lemma, content, words
        )
    }

    #[test]
    fn test_unique_ids_and_spans() {
        let v = extract(r#"\w the\w* \w judges\w* \w judged\w* \w the\w* \w judges\w*"#);
        let ids: Vec<_> = v.highlightable().map(|t| t.unique_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "RUT 1:1:the:1",
                "RUT 1:1:judges:1",
                "RUT 1:1:judged:1",
                "RUT 1:1:the:2",
                "RUT 1:1:judges:2",
            ]
        );
        let judged = v.token("RUT 1:1:judged:1").unwrap();
        assert_eq!(judged.span, TextSpan { start: 11, end: 17 });
        assert_eq!(judged.occurrences, 1);
        assert_eq!(v.token("RUT 1:1:the:2").unwrap().occurrences, 2);
        assert_eq!(v.plain_text, "the judges judged the judges");
    }

    #[test]
    fn test_span_concatenation_matches_plain_text() {
        let v = extract(&format!(
            "{}, {}!",
            milestone("G1", "a", "α", r#"\w Paul\w*"#),
            milestone("G2", "b", "β", r#"\w a\w* \w servant\w*"#)
        ));
        let mut rebuilt = String::new();
        let mut cursor = 0;
        for token in &v.tokens {
            assert_eq!(token.span.start, cursor);
            cursor = token.span.end;
            rebuilt.push_str(&token.content);
        }
        assert_eq!(rebuilt, v.plain_text);
        assert_eq!(v.plain_text, "Paul, a servant!");
    }

    #[test]
    fn test_innermost_milestone_wins() {
        let inner = milestone("G14730", "ἐγώ", "ἐγώ", r#"\w I\w*"#);
        let v = extract(&milestone("G25320", "καί", "καὶ", &format!(r#"\w and\w* {}"#, inner)));

        let and = v.token("RUT 1:1:and:1").unwrap();
        assert_eq!(and.alignment.as_ref().unwrap().strong.as_deref(), Some("G25320"));

        let i = v.token("RUT 1:1:I:1").unwrap();
        let alignment = i.alignment.as_ref().unwrap();
        assert_eq!(alignment.strong.as_deref(), Some("G14730"));
        assert_eq!(alignment.lemma.as_deref(), Some("ἐγώ"));
        assert_eq!(alignment.source_occurrence, Some(1));
    }

    #[test]
    fn test_declared_occurrence_mismatch() {
        let v = extract(
            r#"\w judges|x-occurrence="1" x-occurrences="2"\w* \w judges|x-occurrence="1" x-occurrences="2"\w*"#,
        );
        let second = v.highlightable().nth(1).unwrap();
        assert_eq!(second.occurrence, 2);
        assert_eq!(second.declared_occurrence, Some(1));
        assert_eq!(second.unique_id, "RUT 1:1:judges:2");
        assert_eq!(v.diagnostics.len(), 1);
        assert!(matches!(
            v.diagnostics[0].kind,
            DiagnosticKind::OccurrenceMismatch {
                declared: 1,
                computed: 2,
                ..
            }
        ));
        assert!(!v.has_error());
    }

    #[test]
    fn test_declared_total_mismatch_reported_once() {
        let v = extract(
            r#"\w the|x-occurrence="1" x-occurrences="3"\w* \w the|x-occurrence="2" x-occurrences="3"\w*"#,
        );
        let totals: Vec<_> = v
            .diagnostics
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::OccurrencesTotalMismatch { .. }))
            .collect();
        assert_eq!(totals.len(), 1);
    }

    #[test]
    fn test_declared_total_check_disabled() {
        let parsed = Tokenizer::new().tokenize(r#"\w the|x-occurrences="3"\w*"#);
        let v = Extractor::new(ExtractionConfig {
            check_declared_totals: false,
        })
        .extract(&VerseRef::new("RUT", 1, "1"), &parsed);
        assert!(v.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_milestone_recorded() {
        let v = extract(&format!(
            r#"{}{}"#,
            milestone("G11610", "δέ", "δὲ", ""),
            milestone("G2", "b", "β", r#"\w now\w*"#)
        ));
        assert_eq!(v.highlightable().count(), 1);
        assert_eq!(v.empty_alignments.len(), 1);
        assert_eq!(v.empty_alignments[0].source_content.as_deref(), Some("δὲ"));
        assert!(v
            .diagnostics
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::EmptyAlignment { .. })));
    }

    #[test]
    fn test_empty_milestone_nested() {
        let inner_empty = milestone("G11610", "δέ", "δὲ", "");
        let wrapper = milestone("G25320", "καί", "καὶ", &inner_empty);
        let outer = milestone(
            "G14730",
            "ἐγώ",
            "ἐγὼ",
            &format!(r#"{}\w I\w*"#, milestone("G3", "c", "γ", "")),
        );
        let v = extract(&format!("{}{}", wrapper, outer));

        assert_eq!(v.highlightable().count(), 1);
        let empty: Vec<_> = v
            .empty_alignments
            .iter()
            .filter_map(|a| a.source_content.as_deref())
            .collect();
        assert_eq!(empty, vec!["δὲ", "καὶ", "γ"]);
    }

    #[test]
    fn test_original_language_word_attributes() {
        let v = extract(r#"\w Παῦλος|lemma="Παῦλος" strong="G39720" x-morph="Gr,N,,,,,NMS,"\w*"#);
        let token = v.highlightable().next().unwrap();
        let word = token.word_attributes.as_ref().unwrap();
        assert_eq!(word.strong.as_deref(), Some("G39720"));
        assert!(token.alignment.is_none());
    }

    #[test]
    fn test_partial_tokens_on_parse_error() {
        let v = extract(r#"\w one\w* \zaln-e\* \w two\w*"#);
        assert!(v.has_error());
        assert_eq!(v.highlightable().count(), 1);
        assert!(v.diagnostics.iter().any(|d| d.is_error()));
    }

    #[test]
    fn test_occurrence_independent_of_alignment() {
        let v = extract(&format!(
            r#"\w God\w* {}"#,
            milestone("G23160", "θεός", "θεοῦ", r#"\w God\w*"#)
        ));
        let second = v.highlightable().nth(1).unwrap();
        assert_eq!(second.occurrence, 2);
        assert!(second.is_aligned());
    }
}
