//! Structured, non-fatal findings collected while processing a verse.

use serde::{Deserialize, Serialize};

use crate::{tokenizer::TokenizerError, verse_ref::VerseRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    /// The verse is incomplete.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// The markup's occurrence attribute disagrees with the counted one.
    OccurrenceMismatch {
        content: String,
        declared: u32,
        computed: u32,
    },
    /// The markup's occurrences total disagrees with the counted total.
    OccurrencesTotalMismatch {
        content: String,
        declared: u32,
        computed: u32,
    },
    /// A milestone aligned a source word to nothing renderable.
    EmptyAlignment {
        source_content: Option<String>,
        strong: Option<String>,
    },
    Parse { error: TokenizerError },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub verse_ref: VerseRef,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(verse_ref: &VerseRef, kind: DiagnosticKind) -> Self {
        let severity = match &kind {
            DiagnosticKind::OccurrenceMismatch { .. }
            | DiagnosticKind::OccurrencesTotalMismatch { .. } => Severity::Warning,
            DiagnosticKind::EmptyAlignment { .. } => Severity::Info,
            DiagnosticKind::Parse { .. } => Severity::Error,
        };
        let diagnostic = Self {
            verse_ref: verse_ref.clone(),
            severity,
            kind,
        };
        diagnostic.log();
        diagnostic
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn log(&self) {
        match self.severity {
            Severity::Info => tracing::debug!("{}: {:?}", self.verse_ref, self.kind),
            Severity::Warning => tracing::warn!("{}: {:?}", self.verse_ref, self.kind),
            Severity::Error => tracing::error!("{}: {:?}", self.verse_ref, self.kind),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            DiagnosticKind::OccurrenceMismatch {
                content,
                declared,
                computed,
            } => write!(
                f,
                "{}: \"{}\" declared occurrence {} but is occurrence {}",
                self.verse_ref, content, declared, computed
            ),
            DiagnosticKind::OccurrencesTotalMismatch {
                content,
                declared,
                computed,
            } => write!(
                f,
                "{}: \"{}\" declared {} occurrences but appears {} times",
                self.verse_ref, content, declared, computed
            ),
            DiagnosticKind::EmptyAlignment {
                source_content,
                strong,
            } => write!(
                f,
                "{}: source word {} ({}) aligned to no target words",
                self.verse_ref,
                source_content.as_deref().unwrap_or("?"),
                strong.as_deref().unwrap_or("-")
            ),
            DiagnosticKind::Parse { error } => write!(f, "{}: {}", self.verse_ref, error),
        }
    }
}
