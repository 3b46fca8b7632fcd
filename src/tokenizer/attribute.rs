//! # Attribute Lists
//!
//! Words and alignment milestones carry `key="value"` attribute lists after a
//! `|` separator:
//!
//! ```text
//! \w judges|x-occurrence="1" x-occurrences="2"\w*
//! \zaln-s |x-strong="G29230" x-lemma="κριτής" x-content="κριταί"\*
//! ```
//!
//! Keys are stored without their `x-` prefix so that `x-strong` and `strong`
//! (as used by original-language texts) resolve to the same attribute. A list
//! without any `=` is the default attribute, which is the lemma.

use std::collections::BTreeMap;

use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map},
    error::context,
    multi::many0,
    sequence::{delimited, preceded, separated_pair, terminated},
};
use serde::{Deserialize, Serialize};

use super::token::ParserResult;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(normalize_key(key).to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(normalize_key(key)).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn strong(&self) -> Option<&str> {
        self.get("strong")
    }

    pub fn lemma(&self) -> Option<&str> {
        self.get("lemma")
    }

    pub fn morph(&self) -> Option<&str> {
        self.get("morph")
    }

    pub fn content(&self) -> Option<&str> {
        self.get("content")
    }

    pub fn occurrence(&self) -> Option<u32> {
        self.get("occurrence").and_then(|v| v.trim().parse().ok())
    }

    pub fn occurrences(&self) -> Option<u32> {
        self.get("occurrences").and_then(|v| v.trim().parse().ok())
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut attributes = Attributes::new();
        for (key, value) in iter {
            attributes.insert(key.as_ref(), value);
        }
        attributes
    }
}

fn normalize_key(key: &str) -> &str {
    key.strip_prefix("x-").unwrap_or(key)
}

fn attribute_key(input: &str) -> ParserResult<&str> {
    context(
        "attribute key",
        take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_'),
    )(input)
}

fn attribute_value(input: &str) -> ParserResult<&str> {
    context(
        "attribute value",
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
    )(input)
}

fn attribute_pair(input: &str) -> ParserResult<(&str, &str)> {
    separated_pair(
        attribute_key,
        delimited(multispace0, char('='), multispace0),
        attribute_value,
    )(input)
}

/// Parses the text between `|` and the closing marker.
#[tracing::instrument(level = "trace", skip(input))]
pub fn parse_attributes(input: &str) -> ParserResult<Attributes> {
    if !input.contains('=') {
        let mut attributes = Attributes::new();
        let lemma = input.trim();
        if !lemma.is_empty() {
            attributes.insert("lemma", lemma);
        }
        return Ok(("", attributes));
    }

    context(
        "attribute list",
        all_consuming(map(
            terminated(many0(preceded(multispace0, attribute_pair)), multispace0),
            |pairs: Vec<(&str, &str)>| pairs.into_iter().collect::<Attributes>(),
        )),
    )(input)
}
