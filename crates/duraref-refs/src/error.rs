//! Error types for reference operations.

use duraref_codec::CodecError;
use duraref_store::StoreError;
use duraref_types::UriError;
use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// Malformed reference URI or unknown kind.
    #[error("uri error: {0}")]
    Uri(#[from] UriError),

    /// Codec resolution or encode/decode failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Backend lookup or I/O failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A value reference's storage returned Absent.
    #[error("no value at {uri}")]
    MissingValue { uri: String },

    /// The bytes at a value URI do not hash to the digest the URI names.
    #[error("content hash mismatch at {uri}: computed {computed}")]
    ChecksumMismatch { uri: String, computed: String },

    /// A mutating operation was attempted on a read-only reference.
    #[error("{op} is not allowed on read-only reference {uri}")]
    ReadOnly { uri: String, op: &'static str },

    /// The operation is not supported by this reference kind or backend.
    #[error("{op} is not supported by {uri}")]
    Unsupported { uri: String, op: &'static str },

    /// The CAS back-off hook elected to stop retrying.
    #[error("atomic swap aborted after {retries} retries: {reason}")]
    CasAborted { retries: u32, reason: String },
}

/// Result alias for reference operations.
pub type RefResult<T> = std::result::Result<T, RefError>;
