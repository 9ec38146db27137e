use crate::checker::distance::{confidence, deletion_variants, levenshtein};
use crate::dict::DeletionTable;
use crate::Suggestion;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Symmetric-deletion index over a base dictionary.
///
/// Maps every deletion variant to the dictionary words that produce it.
/// Immutable once built, so it can be shared between threads freely.
#[derive(Debug, Clone, Default)]
pub struct DeletionIndex {
    // dictionary words in insertion order; the position is the tie-break rank
    words: Vec<String>,
    variants: HashMap<String, Vec<usize>>,
}

impl DeletionIndex {
    /// Build from a dictionary and a deletion-pairs table.
    ///
    /// Every dictionary word is indexed under itself. Table rows whose base
    /// word is not in the dictionary do not contribute.
    pub fn build<I, S>(dictionary: I, table: &DeletionTable) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words = Vec::new();
        let mut ranks: HashMap<String, usize> = HashMap::new();
        for word in dictionary {
            let word = word.as_ref();
            if word.is_empty() || ranks.contains_key(word) {
                continue;
            }
            ranks.insert(word.to_string(), words.len());
            words.push(word.to_string());
        }

        let mut variants: HashMap<String, Vec<usize>> = HashMap::new();
        for (rank, word) in words.iter().enumerate() {
            variants.entry(word.clone()).or_default().push(rank);
        }

        let mut unknown = 0;
        for (base, variant) in table.rows() {
            match ranks.get(base.as_str()) {
                Some(&rank) => {
                    let entry = variants.entry(variant.clone()).or_default();
                    if !entry.contains(&rank) {
                        entry.push(rank);
                    }
                }
                None => unknown += 1,
            }
        }

        debug!(
            words = words.len(),
            variants = variants.len(),
            unknown_base_words = unknown,
            "built deletion index"
        );

        Self { words, variants }
    }

    /// Build from a dictionary alone, generating the complete deletion table.
    pub fn from_words(dictionary: &[String], max_distance: usize) -> Self {
        let table = DeletionTable::generate(dictionary, max_distance);
        Self::build(dictionary, &table)
    }

    /// Dictionary words within `max_distance` edits of `word`.
    ///
    /// Ordered by distance, ties in dictionary order. Every candidate found
    /// through a shared deletion variant is confirmed with a real edit
    /// distance before it is returned.
    pub fn lookup(&self, word: &str, max_distance: usize) -> Vec<Suggestion> {
        let word_len = word.chars().count();
        let mut seen = HashSet::new();
        let mut hits: Vec<(usize, usize)> = Vec::new();

        for variant in deletion_variants(word, max_distance) {
            let Some(ranks) = self.variants.get(&variant) else {
                continue;
            };
            for &rank in ranks {
                if !seen.insert(rank) {
                    continue;
                }
                let candidate = &self.words[rank];
                if candidate.chars().count().abs_diff(word_len) > max_distance {
                    continue;
                }
                let distance = levenshtein(word, candidate);
                if distance <= max_distance {
                    hits.push((distance, rank));
                }
            }
        }

        hits.sort_unstable();
        hits.into_iter()
            .map(|(distance, rank)| Suggestion::new(&self.words[rank], confidence(distance)))
            .collect()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.variants
            .get(word)
            .map(|ranks| ranks.iter().any(|r| self.words[*r] == word))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn texts(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_lookup_with_supplied_table() {
        let dictionary = words(&["aaaa", "bbbb", "cccc"]);
        let table = DeletionTable::from_pairs([("aaaa", "aaa"), ("bbbb", "bbb"), ("cccc", "ccc")]);
        let index = DeletionIndex::build(&dictionary, &table);

        assert_eq!(index.lookup("aaa", 1), vec![Suggestion::new("aaaa", 0.9)]);
        assert_eq!(index.lookup("ccc", 1), vec![Suggestion::new("cccc", 0.9)]);
        assert!(index.lookup("ddd", 1).is_empty());
    }

    #[test]
    fn test_lookup_only_reaches_indexed_variants() {
        let dictionary = words(&["aaaa"]);
        let index = DeletionIndex::build(&dictionary, &DeletionTable::default());
        // "aaa" needs the aaaa -> aaa row
        assert!(index.lookup("aaa", 1).is_empty());
        // insertion is reachable through the word itself
        assert_eq!(index.lookup("aaaaa", 1), vec![Suggestion::new("aaaa", 0.9)]);
    }

    #[test]
    fn test_rows_for_unknown_words_are_ignored() {
        let dictionary = words(&["cat"]);
        let table = DeletionTable::from_pairs([("dog", "dg"), ("cat", "ct")]);
        let index = DeletionIndex::build(&dictionary, &table);
        assert!(index.lookup("dg", 1).is_empty());
        assert_eq!(texts(&index.lookup("ct", 1)), vec!["cat"]);
    }

    #[test]
    fn test_empty_dictionary() {
        let table = DeletionTable::from_pairs([("aaaa", "aaa")]);
        let index = DeletionIndex::build(Vec::<String>::new(), &table);
        assert!(index.is_empty());
        assert!(index.lookup("aaa", 3).is_empty());
        assert!(index.lookup("", 3).is_empty());
    }

    #[test]
    fn test_exact_match_at_distance_zero() {
        let index = DeletionIndex::from_words(&words(&["cat", "cart"]), 1);
        assert_eq!(index.lookup("cat", 0), vec![Suggestion::new("cat", 1.0)]);
        assert!(index.lookup("cst", 0).is_empty());
    }

    #[test]
    fn test_ordering_by_distance_then_dictionary_order() {
        let index = DeletionIndex::from_words(&words(&["hats", "cat", "bat", "xat", "hat"]), 2);
        let found = index.lookup("xat", 2);
        assert_eq!(texts(&found), vec!["xat", "cat", "bat", "hat", "hats"]);
        assert_eq!(found[0].confidence, 1.0);
        assert_eq!(found[1].confidence, 0.9);
        assert_eq!(found[4].confidence, 0.81);
    }

    #[test]
    fn test_collisions_are_confirmed() {
        // "ab" and "ba" share the variants "a" and "b" but are two edits apart
        let index = DeletionIndex::from_words(&words(&["ba"]), 1);
        assert!(index.lookup("ab", 1).is_empty());
        assert_eq!(texts(&index.lookup("ab", 2)), vec!["ba"]);
    }

    #[test]
    fn test_unicode_code_points() {
        let index = DeletionIndex::from_words(&words(&["εἰς", "ἐν"]), 1);
        assert_eq!(index.lookup("εις", 1), vec![Suggestion::new("εἰς", 0.9)]);
        assert_eq!(index.lookup("ἐνα", 1), vec![Suggestion::new("ἐν", 0.9)]);
    }

    #[test]
    fn test_duplicates_keep_first_position() {
        let dictionary = words(&["bat", "cat", "bat"]);
        let index = DeletionIndex::from_words(&dictionary, 1);
        assert_eq!(index.len(), 2);
        assert!(index.contains("cat"));
        assert!(!index.contains("at"));
        assert_eq!(texts(&index.lookup("at", 1)), vec!["bat", "cat"]);
    }

    #[test]
    fn test_complete_and_sound_against_brute_force() {
        let alphabet = ['a', 'b', 'c'];
        let mut all = vec![String::new()];
        let mut frontier = vec![String::new()];
        for _ in 0..4 {
            let mut next = Vec::new();
            for s in &frontier {
                for c in alphabet {
                    next.push(format!("{}{}", s, c));
                }
            }
            all.extend(next.iter().cloned());
            frontier = next;
        }

        let dictionary = words(&["abc", "cab", "bbbb", "a", "acca", "ba"]);
        for max_distance in 0..=2 {
            let index = DeletionIndex::from_words(&dictionary, max_distance);
            for query in &all {
                let found = texts(&index.lookup(query, max_distance))
                    .into_iter()
                    .map(str::to_string)
                    .collect::<HashSet<_>>();
                let expected = dictionary
                    .iter()
                    .filter(|w| levenshtein(query, w) <= max_distance)
                    .cloned()
                    .collect::<HashSet<_>>();
                assert_eq!(found, expected, "query {:?} at distance {}", query, max_distance);
            }
        }
    }
}
