//! Error type for PCD decoding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PcdError {
    /// A required header key (VERSION, FIELDS, SIZE, TYPE, WIDTH, HEIGHT, DATA) is absent.
    #[error("Missing header field: {0}")]
    MissingHeaderField(&'static str),

    /// No `DATA` line terminates the header.
    #[error("Malformed header: no DATA line found")]
    MalformedHeader,

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Invalid value for {field}: {value:?}")]
    InvalidHeaderValue { field: &'static str, value: String },

    /// Per-field header lines disagree on the number of fields.
    #[error("{field} declares {found} entries, but FIELDS declares {expected}")]
    FieldCountMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Truncated body: expected at least {expected} bytes, but found {found} bytes")]
    TruncatedBody { expected: usize, found: usize },

    #[error("Decompression failed: {0}")]
    DecompressionError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for PcdError {
    fn from(e: reqwest::Error) -> Self {
        PcdError::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PcdError>;
