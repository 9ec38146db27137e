use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Unicode normalization applied to words before they meet the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    Nfc,
    #[default]
    Nfd,
    None,
}

impl Normalization {
    pub fn apply(self, text: &str) -> String {
        match self {
            Normalization::Nfc => text.nfc().collect(),
            Normalization::Nfd => text.nfd().collect(),
            Normalization::None => text.to_string(),
        }
    }
}

impl FromStr for Normalization {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nfc" => Ok(Normalization::Nfc),
            "nfd" => Ok(Normalization::Nfd),
            "none" => Ok(Normalization::None),
            _ => Err(format!("Unknown normalization: {}", s)),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalization::Nfc => write!(f, "nfc"),
            Normalization::Nfd => write!(f, "nfd"),
            Normalization::None => write!(f, "none"),
        }
    }
}

/// Read a word list, one word per line, trimmed and normalized.
///
/// Blank lines are skipped; order and duplicates are kept.
pub fn load(path: &Path, normalization: Normalization) -> Result<Vec<String>> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8(bytes)
        .map_err(|e| Error::parse(format!("{}: {}", path.display(), e)))?;
    Ok(parse(&content, normalization))
}

pub fn parse(content: &str, normalization: Normalization) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim_start_matches('\u{feff}').trim())
        .filter(|line| !line.is_empty())
        .map(|line| normalization.apply(line))
        .collect()
}

/// Words of a plain-text corpus, split on Unicode word boundaries.
pub fn words_from_text(text: &str) -> Vec<&str> {
    text.unicode_words()
        .filter(|w| w.chars().any(|c| c.is_alphabetic()))
        .collect()
}
