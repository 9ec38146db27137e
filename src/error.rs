use std::fmt;
use std::io;
use thiserror::Error;

/// Errors produced by the hOCR suggestion engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A document or dictionary resource could not be parsed. Fatal for the session.
    #[error("parse error: {0}")]
    Parse(String),

    /// A query expression is syntactically invalid.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A deletion table row could not be understood.
    #[error("malformed deletion table row {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Error::Parse(msg.into())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// An invalid query expression, reported separately from "no matches".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    pub query: String,
    pub position: usize,
    pub message: String,
}

impl QueryError {
    pub fn new(query: &str, position: usize, message: impl Into<String>) -> Self {
        Self {
            query: query.to_string(),
            position,
            message: message.into(),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid query '{}' at offset {}: {}",
            self.query, self.position, self.message
        )
    }
}

impl std::error::Error for QueryError {}
