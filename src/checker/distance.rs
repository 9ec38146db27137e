use std::collections::HashSet;

/// Confidence of a candidate `distance` edits away: `0.9^distance`, four decimals.
pub fn confidence(distance: usize) -> f64 {
    let raw = 0.9f64.powi(distance.min(i32::MAX as usize) as i32);
    (raw * 10_000.0).round() / 10_000.0
}

/// Calculate Levenshtein distance between two strings, by code point
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut row = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            row[j + 1] = std::cmp::min(
                std::cmp::min(
                    prev[j + 1] + 1, // deletion
                    row[j] + 1,      // insertion
                ),
                prev[j] + cost, // substitution
            );
        }
        std::mem::swap(&mut prev, &mut row);
    }

    prev[b_chars.len()]
}

/// Every distinct string obtained from `word` by deleting up to
/// `max_deletions` characters, `word` itself first, in discovery order.
pub fn deletion_variants(word: &str, max_deletions: usize) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut variants = vec![word.to_string()];
    seen.insert(word.to_string());

    let mut frontier = vec![word.to_string()];
    for _ in 0..max_deletions {
        let mut next = Vec::new();
        for current in &frontier {
            let chars: Vec<char> = current.chars().collect();
            for i in 0..chars.len() {
                let candidate: String = chars
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, c)| *c)
                    .collect();
                if seen.insert(candidate.clone()) {
                    variants.push(candidate.clone());
                    next.push(candidate);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    variants
}

/// Whether `variant` can be produced from `base` by deleting characters.
pub fn is_deletion_of(base: &str, variant: &str) -> bool {
    let mut base_chars = base.chars();
    variant
        .chars()
        .all(|v| base_chars.by_ref().any(|b| b == v))
}
