pub mod annotations;
pub mod context;
pub mod document;
pub mod query;
pub mod selector;

pub use annotations::{extract_suggestions, insert_suggestion, insert_suggestions};
pub use context::HocrContext;
pub use document::{Document, Element, NodeId, NodeKind};
pub use query::Query;
pub use selector::{
    extract_bboxes, extract_word_tokens, extract_words, select_words, BboxResult, BoundingBox,
    WordClass, WordElement, UNCHECKED_WORDS_QUERY, WORDS_QUERY,
};
