//! Error types for URI parsing and hash handling.

use thiserror::Error;

/// Errors that can occur while parsing a reference URI.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriError {
    /// The input was empty or all whitespace.
    #[error("empty reference uri")]
    Empty,

    /// The kind prefix is not one of `value`, `volatile`, `atomic`.
    #[error("unknown reference kind: {kind}")]
    UnknownKind { kind: String },

    /// The URI is structurally invalid.
    #[error("malformed reference uri {uri}: {reason}")]
    Malformed { uri: String, reason: String },

    /// A `value:` URI whose last path segment does not start with a
    /// 40-digit lowercase hex SHA-1.
    #[error("value uri must name a sha-1 digest in its last path segment: {uri}")]
    MissingContentHash { uri: String },
}

/// Result alias for URI operations.
pub type UriResult<T> = std::result::Result<T, UriError>;

/// Errors from parsing a content hash out of its text form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    /// The input is not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded digest has the wrong length.
    #[error("invalid digest length: expected 20 bytes, got {actual}")]
    InvalidLength { actual: usize },
}
