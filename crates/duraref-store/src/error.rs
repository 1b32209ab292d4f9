use thiserror::Error;

/// Errors from backend operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No backend is registered for the inner scheme.
    #[error("no backend registered for scheme: {scheme}")]
    UnknownScheme { scheme: String },

    /// The backend does not provide this primitive.
    #[error("{op} is not supported by the {scheme} backend")]
    Unsupported { op: &'static str, scheme: String },

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Adapter-level failure with the adapter's own description.
    #[error("backend error: {0}")]
    Backend(String),

    /// The swap function handed to a native atomic swap failed.
    #[error("swap function failed: {0}")]
    Swap(String),
}

/// Result alias for backend operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
