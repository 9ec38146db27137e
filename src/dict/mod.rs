pub mod deletions;
pub mod wordlist;

pub use deletions::{DeletionTable, MalformedRow};
pub use wordlist::Normalization;
