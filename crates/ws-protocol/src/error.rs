//! Error types for weighing station protocol parsing

use thiserror::Error;

/// Errors that can occur while parsing device replies
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Mass sample was not exactly two bytes
    #[error("invalid mass sample length: expected 2 bytes, got {0}")]
    InvalidLength(usize),

    /// Reply did not start with the expected prefix
    #[error("expected reply starting with {expected:?}, got {line:?}")]
    MissingPrefix { expected: &'static str, line: String },

    /// Reply had no comma separating the value from the rest
    #[error("missing ',' separator in {0:?}")]
    MissingSeparator(String),

    /// Identify reply carried no device identifier
    #[error("empty device identifier in {0:?}")]
    EmptyIdentifier(String),

    /// Distance token was not a number of meters
    #[error("invalid distance {0:?}")]
    InvalidDistance(String),
}
