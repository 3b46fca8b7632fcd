//! # Document Pipeline
//!
//! Runs preprocessing, tokenizing, extraction and indexing over a verse, a
//! chapter or a whole book. Processing is synchronous and never fails: faults
//! become diagnostics on the verse they occur in.
//!
//! Every call produces a new generation number. Results of an older
//! generation are superseded wholesale; nothing is patched in place.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::{
    alignment::{AlignmentIndex, PanelRole},
    config::{MarkupConfig, SyncConfig},
    diagnostics::Diagnostic,
    extractor::{Extractor, VerseExtraction, WordToken},
    preprocessor::Preprocessor,
    resolver::PanelTokens,
    tokenizer::{
        chapter::{split_book, ChapterMarkup},
        Tokenizer,
    },
    verse_ref::VerseRef,
};

#[derive(Debug, Clone, Serialize)]
pub struct VerseResult {
    pub generation: u64,
    #[serde(flatten)]
    pub extraction: VerseExtraction,
    pub index: AlignmentIndex,
}

impl VerseResult {
    pub fn tokens(&self) -> &[WordToken] {
        &self.extraction.tokens
    }

    pub fn has_error(&self) -> bool {
        self.extraction.has_error()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterResult {
    pub generation: u64,
    pub book: String,
    pub chapter: u32,
    pub verses: Vec<VerseExtraction>,
    pub index: AlignmentIndex,
}

impl ChapterResult {
    pub fn tokens(&self) -> impl Iterator<Item = &WordToken> {
        self.verses.iter().flat_map(|v| v.tokens.iter())
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.verses.iter().flat_map(|v| v.diagnostics.iter())
    }

    pub fn verse(&self, verse: &str) -> Option<&VerseExtraction> {
        self.verses.iter().find(|v| v.verse_ref.verse == verse)
    }

    /// Verses that stopped at a structural fault.
    pub fn failed_verses(&self) -> impl Iterator<Item = &VerseExtraction> {
        self.verses.iter().filter(|v| v.has_error())
    }

    pub fn has_errors(&self) -> bool {
        self.failed_verses().next().is_some()
    }

    /// What a panel rendering this chapter reports to the bus.
    pub fn panel_tokens(&self) -> PanelTokens {
        PanelTokens::with_index(self.tokens().cloned().collect(), self.index.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookResult {
    pub generation: u64,
    pub book: String,
    pub chapters: Vec<ChapterResult>,
    pub index: AlignmentIndex,
}

impl BookResult {
    pub fn chapter(&self, chapter: u32) -> Option<&ChapterResult> {
        self.chapters.iter().find(|c| c.chapter == chapter)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &WordToken> {
        self.chapters.iter().flat_map(|c| c.tokens())
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.chapters.iter().flat_map(|c| c.diagnostics())
    }

    pub fn verse_count(&self) -> usize {
        self.chapters.iter().map(|c| c.verses.len()).sum()
    }
}

#[derive(Debug)]
pub struct DocumentPipeline {
    role: PanelRole,
    markup: MarkupConfig,
    preprocessor: Preprocessor,
    extractor: Extractor,
    generation: AtomicU64,
}

impl DocumentPipeline {
    pub fn new(config: &SyncConfig, role: PanelRole) -> Self {
        Self {
            role,
            markup: config.markup.clone(),
            preprocessor: Preprocessor::new(&config.markup),
            extractor: Extractor::new(config.extraction.clone()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn role(&self) -> PanelRole {
        self.role
    }

    /// Generation of the most recent result, `0` before the first call.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Processes one verse body (no `\v` marker needed).
    #[tracing::instrument(level = "debug", skip(self, markup), fields(verse = %verse_ref))]
    pub fn process_verse(&self, verse_ref: &VerseRef, markup: &str) -> VerseResult {
        let extraction = self.extract(verse_ref, &self.preprocessor.process(markup));
        let index = AlignmentIndex::build(&extraction.tokens, self.role);
        VerseResult {
            generation: self.next_generation(),
            extraction,
            index,
        }
    }

    /// Processes one chapter. A `\c` marker in the markup takes precedence
    /// over `chapter_hint`.
    #[tracing::instrument(level = "debug", skip(self, markup))]
    pub fn process_chapter(&self, book: &str, chapter_hint: u32, markup: &str) -> ChapterResult {
        let generation = self.next_generation();
        let chapters = self.split(book, markup);
        let chapter = chapters
            .iter()
            .find_map(|c| c.chapter)
            .unwrap_or(chapter_hint);
        let verses = chapters
            .iter()
            .flat_map(|c| self.extract_chapter(book, chapter, c))
            .collect();
        self.chapter_result(generation, book, chapter, verses)
    }

    /// Processes a whole book, one [`ChapterResult`] per `\c` marker.
    #[tracing::instrument(level = "debug", skip(self, markup))]
    pub fn process_book(&self, book: &str, markup: &str) -> BookResult {
        let generation = self.next_generation();
        let chapters: Vec<ChapterResult> = self
            .split(book, markup)
            .iter()
            .map(|c| {
                let chapter = c.chapter.unwrap_or(1);
                let verses = self.extract_chapter(book, chapter, c);
                self.chapter_result(generation, book, chapter, verses)
            })
            .collect();
        let index = AlignmentIndex::build(
            chapters.iter().flat_map(|c| c.tokens()),
            self.role,
        );
        tracing::debug!(
            "{}: {} chapters, {} alignment groups",
            book,
            chapters.len(),
            index.len()
        );
        BookResult {
            generation,
            book: book.to_string(),
            chapters,
            index,
        }
    }

    /// Preprocesses and splits `markup`. Verses before the first `\c` are
    /// dropped when a chapter marker follows, since they would share ids
    /// with that chapter's verses.
    fn split(&self, book: &str, markup: &str) -> Vec<ChapterMarkup> {
        let mut chapters = split_book(&self.preprocessor.process(markup));
        let has_marker = chapters.iter().any(|c| c.chapter.is_some());
        if has_marker {
            if let Some(preamble) = chapters.iter().find(|c| c.chapter.is_none()) {
                tracing::warn!(
                    "{}: dropping {} verses before the first chapter marker",
                    book,
                    preamble.verses.len()
                );
            }
            chapters.retain(|c| c.chapter.is_some());
        }
        chapters
    }

    fn chapter_result(
        &self,
        generation: u64,
        book: &str,
        chapter: u32,
        verses: Vec<VerseExtraction>,
    ) -> ChapterResult {
        let index = AlignmentIndex::build(verses.iter().flat_map(|v| v.tokens.iter()), self.role);
        ChapterResult {
            generation,
            book: book.to_string(),
            chapter,
            verses,
            index,
        }
    }

    fn extract_chapter(
        &self,
        book: &str,
        chapter: u32,
        markup: &ChapterMarkup,
    ) -> Vec<VerseExtraction> {
        markup
            .verses
            .iter()
            .map(|v| self.extract(&VerseRef::new(book, chapter, v.verse.clone()), &v.markup))
            .collect()
    }

    fn extract(&self, verse_ref: &VerseRef, markup: &str) -> VerseExtraction {
        let parsed = Tokenizer::with_config(&self.markup).tokenize(markup);
        self.extractor.extract(verse_ref, &parsed)
    }
}

impl Default for DocumentPipeline {
    fn default() -> Self {
        Self::new(&SyncConfig::default(), PanelRole::default())
    }
}
