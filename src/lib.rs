pub mod checker;
pub mod cli;
pub mod config;
pub mod dict;
pub mod error;
pub mod hocr;

pub use checker::{spellcheck, spellcheck_with_wordlist, DeletionIndex, SpellChecker};
pub use config::Config;
pub use dict::DeletionTable;
pub use error::{Error, QueryError, Result};
pub use hocr::{Document, HocrContext};

use serde::Serialize;

/// A correction candidate and its confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub text: String,
    pub confidence: f64,
}

impl Suggestion {
    pub fn new(text: &str, confidence: f64) -> Self {
        Self {
            text: text.to_string(),
            confidence,
        }
    }
}

/// Suggestions written for one word during a spellcheck pass.
#[derive(Debug, Clone, Serialize)]
pub struct WordCorrection {
    pub word: String,
    pub path: String,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SpellcheckReport {
    pub words_checked: usize,
    pub words_annotated: usize,
    pub suggestions_inserted: usize,
    pub corrections: Vec<WordCorrection>,
}

impl SpellcheckReport {
    pub fn merge(&mut self, other: SpellcheckReport) {
        self.words_checked += other.words_checked;
        self.words_annotated += other.words_annotated;
        self.suggestions_inserted += other.suggestions_inserted;
        self.corrections.extend(other.corrections);
    }
}
