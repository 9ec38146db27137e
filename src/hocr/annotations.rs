use crate::hocr::document::{Document, Element, NodeId};
use crate::Suggestion;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

/// Class of the container holding a word's alternatives.
pub const ALTERNATIVES_CLASS: &str = "alternatives";
/// Class of a single alternative entry.
pub const ALTERNATIVE_CLASS: &str = "alt";

lazy_static! {
    static ref NLP: Regex = Regex::new(r"nlp\s+([0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)").unwrap();
}

fn has_class(doc: &Document, id: NodeId, class: &str) -> bool {
    doc.attribute(id, "class")
        .map(|c| c.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

fn containers(doc: &Document, word: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    doc.child_elements(word)
        .filter(move |c| has_class(doc, *c, ALTERNATIVES_CLASS))
}

fn parse_confidence(title: &str) -> Option<f64> {
    NLP.captures(title)?.get(1)?.as_str().parse().ok()
}

pub fn format_confidence(confidence: f64) -> String {
    if confidence.fract() == 0.0 {
        format!("{:.1}", confidence)
    } else {
        format!("{}", confidence)
    }
}

/// Suggestions currently stored on `word`, in stored order.
pub fn extract_suggestions(doc: &Document, word: NodeId) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    for container in containers(doc, word) {
        for entry in doc.child_elements(container) {
            if !has_class(doc, entry, ALTERNATIVE_CLASS) {
                continue;
            }
            let title = doc.attribute(entry, "title").unwrap_or("");
            match parse_confidence(title) {
                Some(confidence) => suggestions.push(Suggestion {
                    text: doc.text_content(entry),
                    confidence,
                }),
                None => warn!(
                    path = %doc.path_of(entry),
                    "skipping alternative without an nlp confidence"
                ),
            }
        }
    }
    suggestions
}

/// Append one suggestion after every suggestion already stored on `word`.
///
/// Creates the alternatives container when the word has none. Existing
/// entries are never reordered or deduplicated.
pub fn insert_suggestion(doc: &mut Document, word: NodeId, text: &str, confidence: f64) {
    if doc.element(word).is_none() {
        warn!(node = %word, "cannot annotate a node that is not an element");
        return;
    }

    let existing = containers(doc, word).last();
    let container = match existing {
        Some(container) => container,
        None => {
            debug!(path = %doc.path_of(word), "creating alternatives container");
            doc.append_element(word, Element::new("span", &[("class", ALTERNATIVES_CLASS)]))
        }
    };

    let title = format!("nlp {}", format_confidence(confidence));
    let entry = doc.append_element(
        container,
        Element::new("ins", &[("class", ALTERNATIVE_CLASS), ("title", &title)]),
    );
    doc.append_text(entry, text);
}

/// Append `suggestions` in the given order, as repeated single inserts would.
pub fn insert_suggestions(doc: &mut Document, word: NodeId, suggestions: &[Suggestion]) {
    for suggestion in suggestions {
        insert_suggestion(doc, word, &suggestion.text, suggestion.confidence);
    }
}
