//! Locating a translation note's quote among a verse's original-language
//! tokens.
//!
//! A quote is whitespace-separated words; `&` separates parts that need not
//! be adjacent. Matching uses computed occurrences only. The declared
//! occurrence on a token never influences which tokens match.

use crate::{
    extractor::{normalize_content, WordToken},
    tokenizer::token::is_word_char,
};

/// Select every match instead of the n-th.
pub const ALL_OCCURRENCES: i32 = -1;

pub const PART_SEPARATOR: char = '&';

fn quote_word(raw: &str) -> String {
    normalize_content(raw)
        .trim_matches(|c: char| !is_word_char(c))
        .to_string()
}

#[derive(Debug, Clone, Default)]
pub struct QuoteMatcher;

impl QuoteMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Tokens matching `quote`. `occurrence` is 1-based; [`ALL_OCCURRENCES`]
    /// returns the union of all matches in document order. A missing
    /// occurrence yields nothing.
    #[tracing::instrument(level = "debug", skip(self, tokens))]
    pub fn find<'a>(&self, tokens: &'a [WordToken], quote: &str, occurrence: i32) -> Vec<&'a WordToken> {
        let parts: Vec<Vec<String>> = quote
            .split(PART_SEPARATOR)
            .map(|part| {
                part.split_whitespace()
                    .map(quote_word)
                    .filter(|w| !w.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|words| !words.is_empty())
            .collect();
        if parts.is_empty() {
            return Vec::new();
        }

        let words: Vec<&WordToken> = tokens.iter().filter(|t| t.is_highlightable).collect();
        let contents: Vec<String> = words.iter().map(|t| quote_word(&t.content)).collect();
        let matches = Self::all_matches(&contents, &parts);
        tracing::debug!("quote {:?} matched {} times", quote, matches.len());

        let selected: Vec<usize> = match occurrence {
            ALL_OCCURRENCES => {
                let mut positions: Vec<usize> = matches.into_iter().flatten().collect();
                positions.sort_unstable();
                positions.dedup();
                positions
            }
            n if n >= 1 => matches
                .into_iter()
                .nth((n - 1) as usize)
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        selected.into_iter().map(|i| words[i]).collect()
    }

    /// Every match as positions into `contents`, ordered by where the first
    /// part starts. Later parts take their first fit after the previous part.
    fn all_matches(contents: &[String], parts: &[Vec<String>]) -> Vec<Vec<usize>> {
        let mut matches = Vec::new();
        for start in 0..contents.len() {
            let mut positions = Vec::new();
            let mut cursor = start;
            let mut complete = true;
            for (i, part) in parts.iter().enumerate() {
                let found = if i == 0 {
                    Self::part_at(contents, part, start).then_some(start)
                } else {
                    (cursor..contents.len()).find(|at| Self::part_at(contents, part, *at))
                };
                match found {
                    Some(at) => {
                        positions.extend(at..at + part.len());
                        cursor = at + part.len();
                    }
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if complete {
                matches.push(positions);
            }
        }
        matches
    }

    fn part_at(contents: &[String], part: &[String], at: usize) -> bool {
        at + part.len() <= contents.len()
            && contents[at..at + part.len()]
                .iter()
                .zip(part)
                .all(|(content, word)| content == word)
    }
}
