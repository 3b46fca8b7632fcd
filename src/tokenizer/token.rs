use nom::{
    error::{convert_error, VerboseError},
    IResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MarkupConfig;

use super::{
    attribute::Attributes,
    marker::{parse_item, MarkupItem},
};

/// A node of the verse markup tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MarkupNode {
    /// Rendered text that is not a word: whitespace and punctuation.
    Text { text: String },
    Word(WordNode),
    AlignmentMilestone(MilestoneNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordNode {
    pub content: String,
    pub attributes: Attributes,
    /// `false` for words split out of bare text rather than `\w` markers.
    pub explicit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneNode {
    pub attributes: Attributes,
    pub children: Vec<MarkupNode>,
    /// `false` when the closing marker was never found.
    pub closed: bool,
}

impl MarkupNode {
    pub fn text(text: impl Into<String>) -> Self {
        MarkupNode::Text { text: text.into() }
    }

    /// Appends the rendered text of this node and its children.
    pub fn render_into(&self, out: &mut String) {
        match self {
            MarkupNode::Text { text } => out.push_str(text),
            MarkupNode::Word(word) => out.push_str(&word.content),
            MarkupNode::AlignmentMilestone(milestone) => {
                for child in &milestone.children {
                    child.render_into(out);
                }
            }
        }
    }
}

/// Tokenizer output for one verse. `error` is set when parsing stopped early
/// or a milestone was left open; `nodes` then holds everything parsed up to
/// the fault.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedVerse {
    pub nodes: Vec<MarkupNode>,
    pub error: Option<TokenizerError>,
}

impl ParsedVerse {
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.render_into(&mut out);
        }
        out
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
struct OpenMilestone {
    node: MilestoneNode,
    span: Span,
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    current_position: usize,
    current_line: usize,
    current_column: usize,
    split_bare_text: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::with_config(&MarkupConfig::default())
    }

    pub fn with_config(config: &MarkupConfig) -> Self {
        Self {
            current_position: 0,
            current_line: 1,   // 1-based
            current_column: 1, // 1-based
            split_bare_text: config.split_bare_text,
        }
    }

    fn reset(&mut self) {
        self.current_position = 0;
        self.current_line = 1;
        self.current_column = 1;
    }

    /// Tokenizes one verse of (preprocessed) markup. Never fails outright:
    /// structural faults are reported through [`ParsedVerse::error`].
    #[tracing::instrument(level = "debug", skip(self, input))]
    pub fn tokenize(&mut self, input: &str) -> ParsedVerse {
        self.reset();
        let mut root: Vec<MarkupNode> = Vec::new();
        let mut open: Vec<OpenMilestone> = Vec::new();
        let mut error = None;
        let mut remaining = input;

        while !remaining.is_empty() {
            let span_start = self.span_here();

            match parse_item(remaining) {
                Ok((new_remaining, item)) => {
                    let consumed = &remaining[..(remaining.len() - new_remaining.len())];
                    self.update_position(consumed);
                    remaining = new_remaining;

                    match item {
                        MarkupItem::MilestoneOpen(attributes) => open.push(OpenMilestone {
                            node: MilestoneNode {
                                attributes,
                                children: Vec::new(),
                                closed: false,
                            },
                            span: self.finish_span(span_start),
                        }),
                        MarkupItem::MilestoneClose => match open.pop() {
                            Some(mut milestone) => {
                                milestone.node.closed = true;
                                push_node(
                                    &mut root,
                                    &mut open,
                                    MarkupNode::AlignmentMilestone(milestone.node),
                                );
                            }
                            None => {
                                error = Some(TokenizerError::UnexpectedMilestoneClose {
                                    span: self.finish_span(span_start),
                                });
                                break;
                            }
                        },
                        MarkupItem::Word {
                            content,
                            attributes,
                        } => push_node(
                            &mut root,
                            &mut open,
                            MarkupNode::Word(WordNode {
                                content: content.to_string(),
                                attributes,
                                explicit: true,
                            }),
                        ),
                        MarkupItem::Text(text) => {
                            for node in self.text_nodes(text) {
                                push_node(&mut root, &mut open, node);
                            }
                        }
                        MarkupItem::Marker(marker) => {
                            tracing::trace!("skipping marker {}", marker);
                        }
                    }
                }
                Err(e) => {
                    let found = remaining.chars().take(20).collect::<String>();
                    let span = Span {
                        end: span_start.start + 1,
                        ..span_start
                    };
                    let err = match e {
                        nom::Err::Incomplete(e) => TokenizerError::Malformed {
                            message: format!("Incomplete input, {:?}", e),
                            found,
                            span,
                        },
                        nom::Err::Error(e) | nom::Err::Failure(e) => TokenizerError::Malformed {
                            message: convert_error(remaining, e).trim().to_string(),
                            found,
                            span,
                        },
                    };
                    error = Some(err);
                    break;
                }
            }
        }

        if error.is_none() {
            if let Some(innermost) = open.last() {
                error = Some(TokenizerError::UnterminatedMilestone {
                    span: innermost.span.clone(),
                    depth: open.len(),
                });
            }
        }

        // fold unclosed milestones back into the tree so their words survive
        while let Some(milestone) = open.pop() {
            push_node(
                &mut root,
                &mut open,
                MarkupNode::AlignmentMilestone(milestone.node),
            );
        }

        if let Some(err) = &error {
            tracing::warn!("{}", err);
        }

        ParsedVerse { nodes: root, error }
    }

    /// Splits a text run into word and separator nodes.
    fn text_nodes(&self, text: &str) -> Vec<MarkupNode> {
        if !self.split_bare_text {
            return vec![MarkupNode::text(text)];
        }

        let mut nodes = Vec::new();
        let mut run = String::new();
        let mut in_word = false;
        for c in text.chars() {
            let is_word = is_word_char(c);
            if is_word != in_word && !run.is_empty() {
                nodes.push(run_node(std::mem::take(&mut run), in_word));
            }
            in_word = is_word;
            run.push(c);
        }
        if !run.is_empty() {
            nodes.push(run_node(run, in_word));
        }
        nodes
    }

    fn span_here(&self) -> Span {
        Span {
            start: self.current_position,
            end: self.current_position,
            line: self.current_line,
            column: self.current_column,
        }
    }

    fn finish_span(&self, start: Span) -> Span {
        Span {
            end: self.current_position,
            ..start
        }
    }

    fn update_position(&mut self, text: &str) {
        for c in text.chars() {
            self.current_position += c.len_utf8();
            if c == '\n' {
                self.current_line += 1;
                self.current_column = 1;
            } else {
                self.current_column += 1;
            }
        }
    }
}

fn push_node(root: &mut Vec<MarkupNode>, open: &mut [OpenMilestone], node: MarkupNode) {
    match open.last_mut() {
        Some(parent) => parent.node.children.push(node),
        None => root.push(node),
    }
}

fn run_node(run: String, is_word: bool) -> MarkupNode {
    if is_word {
        MarkupNode::Word(WordNode {
            content: run,
            attributes: Attributes::new(),
            explicit: false,
        })
    } else {
        MarkupNode::Text { text: run }
    }
}

/// Letters, digits, combining marks (Greek accents, Hebrew points) and
/// in-word apostrophes.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
        || matches!(c, '\'' | '\u{2019}')
        || ('\u{0300}'..='\u{036F}').contains(&c)
        || ('\u{0591}'..='\u{05BD}').contains(&c)
        || matches!(c, '\u{05BF}' | '\u{05C1}' | '\u{05C2}' | '\u{05C4}' | '\u{05C5}' | '\u{05C7}')
}

/// Source position inside the verse markup (byte offsets, 1-based line/column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line: {}, column: {}, start: {}, end: {}",
            self.line, self.column, self.start, self.end
        )
    }
}

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

pub type TokenizerResult<T> = Result<T, TokenizerError>;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenizerError {
    #[error("Malformed markup: {message} at position {span}")]
    Malformed {
        message: String,
        found: String,
        span: Span,
    },

    #[error("Unterminated alignment milestone (depth {depth}) opened at {span}")]
    UnterminatedMilestone { span: Span, depth: usize },

    #[error("Alignment milestone closed without being opened at {span}")]
    UnexpectedMilestoneClose { span: Span },
}

impl TokenizerError {
    pub fn span(&self) -> &Span {
        match self {
            TokenizerError::Malformed { span, .. }
            | TokenizerError::UnterminatedMilestone { span, .. }
            | TokenizerError::UnexpectedMilestoneClose { span } => span,
        }
    }
}
