//! # Interlinear Sync: Alignment-Aware Multi-Panel Synchronisation
//!
//! Keeps several scripture panels (original-language text, aligned
//! translations, translation helps) in step: selecting a word in one panel
//! highlights every word aligned to the same source word, in every panel.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Markup → Preprocessor → Tokenizer → Extractor → Alignment Index
//! ```
//!
//! * [`preprocessor`] normalises line breaks and strips footnotes.
//! * [`tokenizer`] builds a tree of text, word and alignment-milestone nodes
//!   per verse, recovering from structural faults verse by verse.
//! * [`extractor`] assigns every word its `<verseRef>:<content>:<occurrence>`
//!   identity and the innermost milestone's alignment attributes.
//! * [`alignment`] groups tokens by [`alignment::SourceKey`].
//! * [`pipeline`] runs the stages over verses, chapters and books;
//!   [`loader`] is the async seam to whatever fetches the markup.
//!
//! ## Interaction
//!
//! * [`resolver`] expands a click into per-panel highlight sets.
//! * [`bus`] delivers `State`, `Command` and `Event` messages between
//!   registered panels.
//! * [`sync`] wires the two together for clicks, hovers and note selection,
//!   using [`quote`] to find a note's quote among original-language words.
//!
//! Data-quality findings are reported as [`diagnostics::Diagnostic`]s, never
//! as errors.

pub mod alignment;
pub mod bus;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extractor;
pub mod loader;
pub mod pipeline;
pub mod preprocessor;
pub mod quote;
pub mod resolver;
pub mod sync;
pub mod timestamp;
pub mod tokenizer;
pub mod verse_ref;

// Re-exports
pub use alignment::{AlignmentGroup, AlignmentIndex, PanelRole, SourceKey};
pub use bus::{BusError, BusResult, Message, MessageBus, MessagePayload, MessageType, PanelId};
pub use config::SyncConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use error::*;
pub use extractor::{VerseExtraction, WordToken};
pub use pipeline::{BookResult, ChapterResult, DocumentPipeline, VerseResult};
pub use resolver::{HighlightSet, PanelTokens, Resolver};
pub use sync::PanelSync;
pub use verse_ref::VerseRef;
