use thiserror::Error;

/// Errors from codec resolution and use.
#[derive(Debug, Error)]
pub enum CodecError {
    /// No codec is registered for any suffix of the path.
    #[error("no codec registered for any suffix of: {path}")]
    UnknownFormat { path: String },

    /// A transform suffix was matched with nothing left to carry a base
    /// codec (e.g. a path ending in a bare `.gz`).
    #[error("format {format} resolves to a wrapper with no base codec")]
    NoBaseCodec { format: String },

    /// Encoding failed.
    #[error("encode failed for format {format}: {reason}")]
    Encode { format: String, reason: String },

    /// Decoding failed.
    #[error("decode failed for format {format}: {reason}")]
    Decode { format: String, reason: String },
}

/// Result alias for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;
