//! Text analysis applied to text fields at index time.
//!
//! Text is split on Unicode word boundaries (UAX #29) and lowercased.
//! Punctuation and whitespace segments are dropped.
//!
//! ```
//! use glaive::analysis::UnicodeWordAnalyzer;
//!
//! let analyzer = UnicodeWordAnalyzer::new();
//! assert_eq!(analyzer.analyze("Hello, World!"), vec!["hello", "world"]);
//! ```

use unicode_segmentation::UnicodeSegmentation;

/// An analyzer that tokenizes on Unicode word boundaries and lowercases.
#[derive(Clone, Debug, Default)]
pub struct UnicodeWordAnalyzer;

impl UnicodeWordAnalyzer {
    /// Create a new analyzer.
    pub fn new() -> Self {
        UnicodeWordAnalyzer
    }

    /// Turn text into the terms that get indexed.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        text.unicode_words().map(|word| word.to_lowercase()).collect()
    }
}
