//! # Markup Tokenizer
//!
//! Turns one verse of aligned scripture markup into an ordered tree of
//! [`MarkupNode`](token::MarkupNode)s: rendered text, words, and alignment
//! milestones with nested children.
//!
//! ## Design Principles
//!
//! * **Lossless rendering**: whitespace and punctuation between words are kept
//!   as text nodes, so concatenating the rendered nodes reproduces the verse's
//!   plain text exactly.
//! * **Verse-level recovery**: a structural fault (unpaired milestone, broken
//!   word marker) never aborts the document. The verse is returned with every
//!   node parsed up to the fault plus a [`TokenizerError`](token::TokenizerError).
//! * **Explicit nesting**: milestones nest to any depth; the tokenizer keeps an
//!   explicit stack of open milestones rather than recursing.
//!
//! ## Component Structure
//!
//! * [`token`]: node types and the [`Tokenizer`](token::Tokenizer) loop
//! * [`marker`]: nom parsers for single markup items
//! * [`attribute`]: `key="value"` attribute lists
//! * [`chapter`]: splitting book/chapter markup into verses
//!
//! ## Usage Example
//!
//! ```rust
//! use interlinear_sync::tokenizer::token::Tokenizer;
//!
//! let mut tokenizer = Tokenizer::new();
//! let parsed = tokenizer.tokenize(r#"\w Grace\w* \w to\w* \w you\w*"#);
//! assert!(parsed.is_ok());
//! assert_eq!(parsed.plain_text(), "Grace to you");
//! ```

pub mod attribute;
pub mod chapter;
pub mod marker;
pub mod token;

pub use attribute::Attributes;
pub use token::{MarkupNode, MilestoneNode, ParsedVerse, Tokenizer, TokenizerError, WordNode};
