use regex::Regex;

use crate::config::MarkupConfig;

/// Normalises raw markup before tokenizing: line endings, footnotes and
/// cross references, and line breaks (which render as a single space).
#[derive(Debug)]
pub struct Preprocessor {
    re_footnote: Regex,
    re_cross_reference: Regex,
    re_line_breaks: Regex,
    strip_footnotes: bool,
    strip_cross_references: bool,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(&MarkupConfig::default())
    }
}

impl Preprocessor {
    pub fn new(config: &MarkupConfig) -> Self {
        Self {
            re_footnote: Regex::new(r"(?s)\\f\s.*?\\f\*").unwrap(),
            re_cross_reference: Regex::new(r"(?s)\\x\s.*?\\x\*").unwrap(),
            re_line_breaks: Regex::new(r"[ \t]*\n[ \t\n]*").unwrap(),
            strip_footnotes: config.strip_footnotes,
            strip_cross_references: config.strip_cross_references,
        }
    }

    pub fn process(&self, input: &str) -> String {
        let mut output = input.replace("\r\n", "\n").replace('\r', "\n");

        if self.strip_footnotes {
            output = self.re_footnote.replace_all(&output, "").to_string();
        }
        if self.strip_cross_references {
            output = self.re_cross_reference.replace_all(&output, "").to_string();
        }

        self.collapse_line_breaks(&output)
    }

    fn collapse_line_breaks(&self, input: &str) -> String {
        self.re_line_breaks
            .replace_all(input.trim_end_matches('\n'), " ")
            .to_string()
    }
}
