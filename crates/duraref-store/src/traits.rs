//! The [`Backend`] trait defining the byte-level storage contract.
//!
//! A backend adapter registers under one inner-scheme name and exposes a
//! small set of primitives. The required surface is read/write/delete; the
//! versioned primitives and native atomic swap are optional capabilities
//! that default to [`StoreError::Unsupported`].

use duraref_types::{InnerUri, OpOptions};

use crate::error::{StoreError, StoreResult};

/// A blob together with its monotonic version.
///
/// Versions increase by at least one on every successful write to a key and
/// are never reused after a delete, so an observed version doubles as a
/// compare-and-swap precondition token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned {
    pub bytes: Vec<u8>,
    pub version: u64,
}

/// Function applied by a backend-native atomic swap: previous bytes (absent
/// when the key does not exist) to replacement bytes.
pub type ByteSwapFn<'a> = dyn Fn(Option<Vec<u8>>) -> StoreResult<Vec<u8>> + Send + Sync + 'a;

/// Byte-level storage primitives for one inner scheme.
///
/// Implementations must be thread-safe. The contract:
/// - `read` returning `Ok(None)` means Absent — distinct from an error.
/// - `write` must be durable by the time it returns successfully.
/// - `delete` of a missing key is not an error.
/// - The backend never interprets the bytes it stores.
pub trait Backend: Send + Sync {
    /// The inner-scheme name this adapter registers under (e.g. `mem`).
    fn scheme(&self) -> &str;

    /// Read the bytes at a URI. `Ok(None)` means the key is absent.
    fn read(&self, uri: &InnerUri, opts: &OpOptions) -> StoreResult<Option<Vec<u8>>>;

    /// Write bytes at a URI, replacing any previous content.
    fn write(&self, uri: &InnerUri, bytes: &[u8], opts: &OpOptions) -> StoreResult<()>;

    /// Delete the key at a URI. Deleting a missing key succeeds.
    fn delete(&self, uri: &InnerUri, opts: &OpOptions) -> StoreResult<()>;

    /// Whether this backend implements the versioned read/write pair.
    fn supports_versioning(&self) -> bool {
        false
    }

    /// Whether this backend implements a native transactional swap.
    fn supports_atomic_swap(&self) -> bool {
        false
    }

    /// Read bytes together with their version.
    ///
    /// Honors `opts.consistent` where the backend distinguishes consistency
    /// levels. Required for the generic CAS loop.
    fn read_versioned(&self, _uri: &InnerUri, _opts: &OpOptions) -> StoreResult<Option<Versioned>> {
        Err(StoreError::Unsupported {
            op: "read_versioned",
            scheme: self.scheme().to_string(),
        })
    }

    /// Write bytes under a version precondition.
    ///
    /// `expected: Some(v)` succeeds only when the key's current version is
    /// exactly `v`; `expected: None` succeeds only when the key is absent.
    /// Returns `Ok(false)` on precondition failure — that is the CAS
    /// contention signal, not an error.
    fn write_versioned(
        &self,
        _uri: &InnerUri,
        _bytes: &[u8],
        _expected: Option<u64>,
        _opts: &OpOptions,
    ) -> StoreResult<bool> {
        Err(StoreError::Unsupported {
            op: "write_versioned",
            scheme: self.scheme().to_string(),
        })
    }

    /// Apply `f` to the current bytes transactionally and store the result.
    ///
    /// Backends with a native transaction primitive override this; the
    /// returned bytes are the stored replacement. Everyone else relies on
    /// the generic CAS loop built on the versioned primitives.
    fn atomic_swap(
        &self,
        _uri: &InnerUri,
        _f: &ByteSwapFn<'_>,
        _opts: &OpOptions,
    ) -> StoreResult<Vec<u8>> {
        Err(StoreError::Unsupported {
            op: "atomic_swap",
            scheme: self.scheme().to_string(),
        })
    }
}

impl std::fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("scheme", &self.scheme()).finish()
    }
}
