//! Splits preprocessed book or chapter markup into per-verse markup so each
//! verse can be tokenized (and fail) independently.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CHAPTER_MARKER: Regex = Regex::new(r"\\c\s+(\d+)\s?").unwrap();
    static ref VERSE_MARKER: Regex = Regex::new(r"\\v\s+(\d+(?:-\d+)?)\s?").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterMarkup {
    /// `None` when the markup carried no `\c` marker.
    pub chapter: Option<u32>,
    pub verses: Vec<VerseMarkup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerseMarkup {
    pub verse: String,
    /// Verse body without its `\v N` marker.
    pub markup: String,
}

/// Splits a whole book. Anything before the first `\c` (headers) is dropped
/// unless it holds verses.
pub fn split_book(input: &str) -> Vec<ChapterMarkup> {
    let mut chapters = Vec::new();
    let markers: Vec<_> = CHAPTER_MARKER.captures_iter(input).collect();

    let preamble_end = markers
        .first()
        .and_then(|c| c.get(0))
        .map(|m| m.start())
        .unwrap_or(input.len());
    let preamble = split_chapter(&input[..preamble_end]);
    if !preamble.is_empty() {
        chapters.push(ChapterMarkup {
            chapter: None,
            verses: preamble,
        });
    }

    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let body_end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(input.len());
        chapters.push(ChapterMarkup {
            chapter: number.as_str().parse().ok(),
            verses: split_chapter(&input[whole.end()..body_end]),
        });
    }

    chapters
}

/// Splits one chapter into verses. Text before the first `\v` is dropped.
pub fn split_chapter(input: &str) -> Vec<VerseMarkup> {
    let markers: Vec<_> = VERSE_MARKER.captures_iter(input).collect();
    let mut verses = Vec::with_capacity(markers.len());

    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let body_end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(input.len());
        verses.push(VerseMarkup {
            verse: number.as_str().to_string(),
            markup: input[whole.end()..body_end].trim().to_string(),
        });
    }

    verses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_chapter() {
        let verses = split_chapter("\\s5 \\p \\v 1 \\w In\\w* \\v 2 \\w Now\\w* \\p ");
        assert_eq!(verses.len(), 2);
        assert_eq!(verses[0].verse, "1");
        assert_eq!(verses[0].markup, "\\w In\\w*");
        assert_eq!(verses[1].markup, "\\w Now\\w* \\p");
    }

    #[test]
    fn test_split_book_ignores_headers() {
        let input = "\\id TIT EN_ULT \\h Titus \\c 1 \\p \\v 1 Paul \\v 2 hope \\c 2 \\v 1 But";
        let chapters = split_book(input);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].chapter, Some(1));
        assert_eq!(chapters[0].verses.len(), 2);
        assert_eq!(chapters[1].chapter, Some(2));
        assert_eq!(chapters[1].verses[0].markup, "But");
    }

    #[test]
    fn test_split_without_chapter_marker() {
        let chapters = split_book("\\v 1 one \\v 2 two");
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].chapter, None);
        assert_eq!(chapters[0].verses[1].markup, "two");
    }

    #[test]
    fn test_verse_bridge() {
        let verses = split_chapter("\\v 4-5 text");
        assert_eq!(verses[0].verse, "4-5");
    }

    #[test]
    fn test_verse_marker_not_confused_with_va() {
        let verses = split_chapter("\\v 1 a \\va 2\\va* b");
        assert_eq!(verses.len(), 1);
    }
}
