//! Book/chapter/verse references in their canonical `<book> <chapter>:<verse>` form.

use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref VERSE_REF: Regex =
        Regex::new(r"^(?P<book>\S+)\s+(?P<chapter>\d+):(?P<verse>[0-9A-Za-z\-]+)$").unwrap();
}

/// A single verse location. The verse label is kept as text so that bridged
/// verses (`4-5`) survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerseRef {
    pub book: String,
    pub chapter: u32,
    pub verse: String,
}

impl VerseRef {
    pub fn new(book: impl Into<String>, chapter: u32, verse: impl Into<String>) -> Self {
        Self {
            book: book.into(),
            chapter,
            verse: verse.into(),
        }
    }

    /// Same book and chapter, different verse.
    pub fn with_verse(&self, verse: impl Into<String>) -> Self {
        Self {
            book: self.book.clone(),
            chapter: self.chapter,
            verse: verse.into(),
        }
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.book, self.chapter, self.verse)
    }
}

impl FromStr for VerseRef {
    type Err = VerseRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = VERSE_REF
            .captures(s.trim())
            .ok_or_else(|| VerseRefError::Malformed(s.to_string()))?;
        let chapter = caps["chapter"]
            .parse::<u32>()
            .map_err(|_| VerseRefError::Malformed(s.to_string()))?;
        Ok(Self::new(&caps["book"], chapter, &caps["verse"]))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerseRefError {
    #[error("Malformed verse reference: {0}")]
    Malformed(String),
}

pub type VerseRefResult<T> = Result<T, VerseRefError>;
