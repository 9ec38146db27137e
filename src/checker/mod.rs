pub mod distance;
pub mod index;

pub use index::DeletionIndex;

use crate::dict::{wordlist, DeletionTable, Normalization};
use crate::error::Result;
use crate::hocr::annotations::insert_suggestions;
use crate::hocr::document::Document;
use crate::hocr::selector::{select_words, WordElement};
use crate::{Config, SpellcheckReport, Suggestion, WordCorrection};
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

pub struct SpellChecker {
    index: DeletionIndex,
    max_edit_distance: usize,
    normalization: Normalization,
}

impl SpellChecker {
    pub fn new(config: &Config) -> Result<Self> {
        // Load main dictionary
        let words = match &config.dictionary {
            Some(path) => wordlist::load(path, config.normalization)?,
            None => {
                warn!("no dictionary configured, no suggestions will be produced");
                Vec::new()
            }
        };

        // Load or generate the deletion table
        let table = match &config.deletions {
            Some(path) => {
                let table = DeletionTable::load(path)?;
                if !table.skipped().is_empty() {
                    warn!(
                        path = %path.display(),
                        skipped = table.skipped().len(),
                        "skipped malformed deletion table rows"
                    );
                }
                table.normalized(config.normalization)
            }
            None => DeletionTable::generate(&words, config.max_edit_distance),
        };

        let index = DeletionIndex::build(&words, &table);
        info!(
            words = index.len(),
            variants = index.variant_count(),
            "dictionary ready"
        );

        Ok(Self {
            index,
            max_edit_distance: config.max_edit_distance,
            normalization: config.normalization,
        })
    }

    /// Wrap an existing index. Document words are looked up as they are.
    pub fn from_index(index: DeletionIndex, max_edit_distance: usize) -> Self {
        Self {
            index,
            max_edit_distance,
            normalization: Normalization::None,
        }
    }

    pub fn index(&self) -> &DeletionIndex {
        &self.index
    }

    /// Annotate every word selected by `unchecked_query` with its candidates.
    ///
    /// Lookups run in parallel; insertions happen afterwards, one word at a
    /// time, in document order.
    pub fn check_document(&self, doc: &mut Document, unchecked_query: &str) -> Result<SpellcheckReport> {
        let words = select_words(doc, unchecked_query)?;

        let lookups: Vec<(WordElement, Vec<Suggestion>)> = words
            .into_par_iter()
            .map(|word| {
                let suggestions = if word.text.is_empty() {
                    Vec::new()
                } else {
                    let normalized = self.normalization.apply(&word.text);
                    self.index.lookup(&normalized, self.max_edit_distance)
                };
                (word, suggestions)
            })
            .collect();

        let mut report = SpellcheckReport {
            words_checked: lookups.len(),
            ..Default::default()
        };

        for (word, suggestions) in lookups {
            let path = word.path(doc);
            if suggestions.is_empty() {
                debug!(word = %word.text, path = %path, "no candidates");
                continue;
            }

            debug!(word = %word.text, path = %path, candidates = suggestions.len(), "annotating");
            insert_suggestions(doc, word.node, &suggestions);

            report.words_annotated += 1;
            report.suggestions_inserted += suggestions.len();
            report.corrections.push(WordCorrection {
                word: word.text,
                path,
                suggestions,
            });
        }

        info!(
            checked = report.words_checked,
            annotated = report.words_annotated,
            inserted = report.suggestions_inserted,
            "spellcheck pass complete"
        );
        Ok(report)
    }
}

/// Spellcheck `doc` against an in-memory dictionary.
pub fn spellcheck<I, S>(
    doc: &mut Document,
    unchecked_query: &str,
    dictionary: I,
    deletion_table: &DeletionTable,
    max_edit_distance: usize,
) -> Result<SpellcheckReport>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let index = DeletionIndex::build(dictionary, deletion_table);
    SpellChecker::from_index(index, max_edit_distance).check_document(doc, unchecked_query)
}

/// Spellcheck `doc` against a word list file, one word per line.
pub fn spellcheck_with_wordlist(
    doc: &mut Document,
    unchecked_query: &str,
    wordlist: &Path,
    deletion_table: &DeletionTable,
    max_edit_distance: usize,
) -> Result<SpellcheckReport> {
    let words = wordlist::load(wordlist, Normalization::None)?;
    spellcheck(doc, unchecked_query, &words, deletion_table, max_edit_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hocr::annotations::extract_suggestions;
    use crate::hocr::selector::{extract_words, UNCHECKED_WORDS_QUERY};
    use crate::Error;
    use std::fs;
    use tempfile::tempdir;

    const PAGE: &str = r#"<html><body><p class="ocr_par">
        <span class="ocrx_word" title="bbox 1 1 2 2">aaa</span>
        <span class="ocrx_word" title="bbox 3 3 4 4">bbb</span>
        <span class="ocr_word" title="bbox 5 5 6 6">ccc</span>
        <span class="ocrx_word" title="bbox 7 7 8 8"><span class="ocr_cinfo">aaa</span></span>
        <span class="ocrx_word" title="bbox 9 9 9 9">zzz</span>
    </p></body></html>"#;

    fn dictionary() -> Vec<String> {
        vec!["aaaa".to_string(), "bbbb".to_string(), "cccc".to_string()]
    }

    fn table() -> DeletionTable {
        DeletionTable::from_pairs([("aaaa", "aaa"), ("bbbb", "bbb"), ("cccc", "ccc")])
    }

    fn stored(doc: &Document) -> Vec<(String, Vec<Suggestion>)> {
        extract_words(doc)
            .into_iter()
            .map(|w| (w.text.clone(), extract_suggestions(doc, w.node)))
            .collect()
    }

    #[test]
    fn test_spellcheck_end_to_end() {
        let mut doc = Document::parse(PAGE).unwrap();
        let report = spellcheck(&mut doc, UNCHECKED_WORDS_QUERY, &dictionary(), &table(), 1).unwrap();

        assert_eq!(report.words_checked, 4);
        assert_eq!(report.words_annotated, 3);
        assert_eq!(report.suggestions_inserted, 3);
        assert_eq!(report.corrections[0].path, "/html/body/p/span[1]");

        assert_eq!(
            stored(&doc),
            vec![
                ("aaa".to_string(), vec![Suggestion::new("aaaa", 0.9)]),
                ("bbb".to_string(), vec![Suggestion::new("bbbb", 0.9)]),
                ("ccc".to_string(), vec![Suggestion::new("cccc", 0.9)]),
                ("zzz".to_string(), vec![]),
            ]
        );
        // the nested word is untouched
        assert!(doc.to_xml().contains(
            r#"<span class="ocrx_word" title="bbox 7 7 8 8"><span class="ocr_cinfo">aaa</span></span>"#
        ));
        // no empty container for the word without candidates
        assert!(doc
            .to_xml()
            .contains(r#"<span class="ocrx_word" title="bbox 9 9 9 9">zzz</span>"#));
    }

    #[test]
    fn test_second_pass_skips_annotated_words() {
        let mut doc = Document::parse(PAGE).unwrap();
        spellcheck(&mut doc, UNCHECKED_WORDS_QUERY, &dictionary(), &table(), 1).unwrap();
        let once = doc.to_xml();

        let report = spellcheck(&mut doc, UNCHECKED_WORDS_QUERY, &dictionary(), &table(), 1).unwrap();
        assert_eq!(report.words_checked, 1);
        assert_eq!(report.words_annotated, 0);
        assert_eq!(doc.to_xml(), once);
    }

    #[test]
    fn test_invalid_query_is_reported() {
        let mut doc = Document::parse(PAGE).unwrap();
        let result = spellcheck(&mut doc, "//span[", &dictionary(), &table(), 1);
        assert!(matches!(result, Err(Error::Query(_))));
    }

    #[test]
    fn test_spellcheck_with_wordlist() {
        let dir = tempdir().unwrap();
        let list = dir.path().join("words.txt");
        fs::write(&list, "aaaa\nbbbb\ncccc\n").unwrap();

        let mut doc = Document::parse(PAGE).unwrap();
        let report = spellcheck_with_wordlist(&mut doc, UNCHECKED_WORDS_QUERY, &list, &table(), 1).unwrap();
        assert_eq!(report.words_annotated, 3);

        let mut expected = Document::parse(PAGE).unwrap();
        spellcheck(&mut expected, UNCHECKED_WORDS_QUERY, &dictionary(), &table(), 1).unwrap();
        assert_eq!(doc.to_xml(), expected.to_xml());
    }

    #[test]
    fn test_checker_from_config_generates_table_and_normalizes() {
        let dir = tempdir().unwrap();
        let list = dir.path().join("words.txt");
        // composed e-acute in the word list
        fs::write(&list, "caf\u{e9}\nfade\n").unwrap();

        let config = Config {
            dictionary: Some(list),
            max_edit_distance: 1,
            ..Default::default()
        };
        let checker = SpellChecker::new(&config).unwrap();

        let page = "<p><span class='ocrx_word'>caf\u{e9}</span><span class='ocrx_word'>fad</span></p>";
        let mut doc = Document::parse(page).unwrap();
        let report = checker.check_document(&mut doc, UNCHECKED_WORDS_QUERY).unwrap();

        assert_eq!(report.words_annotated, 2);
        // both sides decomposed before lookup
        assert_eq!(
            report.corrections[0].suggestions,
            vec![Suggestion::new("cafe\u{301}", 1.0)]
        );
        assert_eq!(
            report.corrections[1].suggestions,
            vec![Suggestion::new("fade", 0.9)]
        );
    }
}
