//! # Marker Parsing
//!
//! Single-step parsers for the markup items that can appear inside a verse.
//! Each parser recognises exactly one [`MarkupItem`]; the tree is assembled by
//! [`Tokenizer`](super::token::Tokenizer), which owns the milestone stack.
//!
//! Recognised items, tried in order:
//!
//! 1. alignment milestone open `\zaln-s |...\*`
//! 2. alignment milestone close `\zaln-e\*`
//! 3. word `\w content|attributes\w*`
//! 4. chapter/verse numbers `\c 1`, `\v 12`
//! 5. any other marker (`\p`, `\q1`, `\ts\*`, `\k-s |...\*`, `\add*`) which is
//!    consumed without rendering
//! 6. a run of plain text

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_until, take_while1},
    character::complete::{char, digit1, multispace0, space0},
    combinator::{map, opt, recognize, verify},
    error::{context, VerboseError, VerboseErrorKind},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use super::{
    attribute::{parse_attributes, Attributes},
    token::ParserResult,
};

pub const MILESTONE_OPEN: &str = "\\zaln-s";
pub const MILESTONE_CLOSE: &str = "\\zaln-e\\*";
pub const WORD_OPEN: &str = "\\w ";
pub const WORD_CLOSE: &str = "\\w*";

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupItem<'a> {
    MilestoneOpen(Attributes),
    MilestoneClose,
    Word {
        content: &'a str,
        attributes: Attributes,
    },
    /// A marker that does not render, kept only for tracing.
    Marker(&'a str),
    Text(&'a str),
}

#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_milestone_open(input: &str) -> ParserResult<MarkupItem> {
    let (rest, section) = context(
        "alignment milestone",
        preceded(
            tuple((tag(MILESTONE_OPEN), space0, opt(char('|')))),
            terminated(take_until("\\*"), tag("\\*")),
        ),
    )(input)?;
    let (_, attributes) =
        parse_attributes(section).map_err(|_| attribute_failure(input, "milestone attributes"))?;
    Ok((rest, MarkupItem::MilestoneOpen(attributes)))
}

#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_milestone_close(input: &str) -> ParserResult<MarkupItem> {
    context(
        "alignment milestone close",
        map(tag(MILESTONE_CLOSE), |_| MarkupItem::MilestoneClose),
    )(input)
}

#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_word(input: &str) -> ParserResult<MarkupItem> {
    let (rest, (content, section)) = context(
        "word",
        delimited(
            tag(WORD_OPEN),
            pair(
                take_till1(|c| c == '|' || c == '\\'),
                opt(preceded(char('|'), take_until(WORD_CLOSE))),
            ),
            tag(WORD_CLOSE),
        ),
    )(input)?;

    let attributes = match section {
        Some(section) => {
            parse_attributes(section)
                .map_err(|_| attribute_failure(input, "word attributes"))?
                .1
        }
        None => Attributes::new(),
    };

    Ok((
        rest,
        MarkupItem::Word {
            content: content.trim(),
            attributes,
        },
    ))
}

/// `\c N` and `\v N` including the number, which is not verse text.
#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_number_marker(input: &str) -> ParserResult<MarkupItem> {
    context(
        "chapter or verse number",
        map(
            terminated(
                recognize(tuple((
                    alt((tag("\\c"), tag("\\v"))),
                    char(' '),
                    multispace0,
                    digit1,
                    opt(pair(char('-'), digit1)),
                ))),
                opt(char(' ')),
            ),
            MarkupItem::Marker,
        ),
    )(input)
}

fn marker_name(input: &str) -> ParserResult<&str> {
    verify(
        preceded(
            opt(char('+')),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-'),
        ),
        |name: &str| !matches!(name, "w" | "zaln-s" | "zaln-e"),
    )(input)
}

#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_marker(input: &str) -> ParserResult<MarkupItem> {
    context(
        "marker",
        map(
            terminated(
                recognize(tuple((
                    char('\\'),
                    marker_name,
                    alt((
                        // milestone with attributes, `\k-s | ... \*`
                        recognize(pair(
                            verify(take_until("\\*"), |body: &str| {
                                body.trim_start().starts_with('|')
                            }),
                            tag("\\*"),
                        )),
                        tag("\\*"),
                        tag("*"),
                        tag(""),
                    )),
                ))),
                // one space after the marker is part of the marker syntax
                opt(char(' ')),
            ),
            MarkupItem::Marker,
        ),
    )(input)
}

#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_text(input: &str) -> ParserResult<MarkupItem> {
    context(
        "text",
        map(take_till1(|c| c == '\\'), MarkupItem::Text),
    )(input)
}

pub fn parse_item(input: &str) -> ParserResult<MarkupItem> {
    alt((
        parse_milestone_open,
        parse_milestone_close,
        parse_word,
        parse_number_marker,
        parse_marker,
        parse_text,
    ))(input)
}

/// A broken attribute list is fatal for the item; no other parser may
/// reinterpret it.
fn attribute_failure<'a>(at: &'a str, what: &'static str) -> nom::Err<VerboseError<&'a str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(at, VerboseErrorKind::Context(what))],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestone_open() {
        let input = r#"\zaln-s |x-strong="G29230" x-lemma="κριτής" x-occurrence="1" x-occurrences="1" x-content="κριταί"\*\w judges\w*"#;
        let (rest, item) = parse_milestone_open(input).unwrap();
        assert_eq!(rest, "\\w judges\\w*");
        match item {
            MarkupItem::MilestoneOpen(attrs) => {
                assert_eq!(attrs.strong(), Some("G29230"));
                assert_eq!(attrs.content(), Some("κριταί"));
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_milestone_close() {
        let (rest, item) = parse_milestone_close("\\zaln-e\\*, and").unwrap();
        assert_eq!(item, MarkupItem::MilestoneClose);
        assert_eq!(rest, ", and");
    }

    #[test]
    fn test_word_with_attributes() {
        let (rest, item) =
            parse_word(r#"\w judges|x-occurrence="2" x-occurrences="2"\w* rest"#).unwrap();
        assert_eq!(rest, " rest");
        match item {
            MarkupItem::Word {
                content,
                attributes,
            } => {
                assert_eq!(content, "judges");
                assert_eq!(attributes.occurrence(), Some(2));
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_word_without_attributes() {
        let (rest, item) = parse_word("\\w Paul\\w*,").unwrap();
        assert_eq!(rest, ",");
        assert!(matches!(item, MarkupItem::Word { content: "Paul", .. }));
    }

    #[test]
    fn test_unterminated_word_fails() {
        assert!(parse_word("\\w Paul and").is_err());
        // and is not swallowed as a generic marker either
        assert!(parse_item("\\w Paul and").is_err());
    }

    #[test]
    fn test_word_with_broken_attributes_fails() {
        assert!(parse_word(r#"\w Paul|x-occurrence="1\w*"#).is_err());
    }

    #[test]
    fn test_number_markers() {
        let (rest, item) = parse_number_marker("\\v 12 In").unwrap();
        assert_eq!(rest, "In");
        assert_eq!(item, MarkupItem::Marker("\\v 12"));
        let (rest, _) = parse_number_marker("\\v 4-5 text").unwrap();
        assert_eq!(rest, "text");
    }

    #[test]
    fn test_generic_markers() {
        let (rest, _) = parse_marker("\\p \\w In\\w*").unwrap();
        assert_eq!(rest, "\\w In\\w*");
        let (rest, _) = parse_marker("\\ts\\* next").unwrap();
        assert_eq!(rest, "next");
        let (rest, _) = parse_marker("\\k-s | x-tw=\"rc://*/tw/dict/bible/kt/god\"\\*God").unwrap();
        assert_eq!(rest, "God");
        let (rest, _) = parse_marker("\\add*.").unwrap();
        assert_eq!(rest, ".");
    }

    #[test]
    fn test_text_run() {
        let (rest, item) = parse_text(", and \\w the\\w*").unwrap();
        assert_eq!(item, MarkupItem::Text(", and "));
        assert_eq!(rest, "\\w the\\w*");
    }
}
