//! Per-verse occurrence counting.

use std::collections::HashMap;

/// Characters that never distinguish two surface forms.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}'
    )
}

/// Counter key for a word's content: trimmed, without zero-width characters.
pub fn normalize_content(content: &str) -> String {
    content.trim().chars().filter(|c| !is_invisible(*c)).collect()
}

/// Running 1-based counter keyed by normalized content. One counter covers
/// exactly one verse, in document order.
#[derive(Debug, Default, Clone)]
pub struct OccurrenceCounter {
    counts: HashMap<String, u32>,
}

impl OccurrenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more instance of `content` and returns its occurrence.
    pub fn next(&mut self, content: &str) -> u32 {
        let count = self.counts.entry(normalize_content(content)).or_insert(0);
        *count += 1;
        *count
    }

    /// Number of instances seen so far.
    pub fn total(&self, content: &str) -> u32 {
        self.counts
            .get(&normalize_content(content))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_are_contiguous() {
        let mut counter = OccurrenceCounter::new();
        assert_eq!(counter.next("the"), 1);
        assert_eq!(counter.next("judges"), 1);
        assert_eq!(counter.next("the"), 2);
        assert_eq!(counter.next("judges"), 2);
        assert_eq!(counter.total("the"), 2);
        assert_eq!(counter.total("missing"), 0);
    }

    #[test]
    fn test_case_sensitive() {
        let mut counter = OccurrenceCounter::new();
        assert_eq!(counter.next("The"), 1);
        assert_eq!(counter.next("the"), 1);
    }

    #[test]
    fn test_zero_width_ignored() {
        let mut counter = OccurrenceCounter::new();
        counter.next("God");
        assert_eq!(counter.next("God\u{200B}"), 2);
        assert_eq!(normalize_content(" God\u{FEFF} "), "God");
    }
}
