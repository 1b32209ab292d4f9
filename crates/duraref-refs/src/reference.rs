//! The [`Ref`] enum: one handle over the four reference kinds.

use std::fmt;
use std::sync::Arc;

use duraref_codec::ResolvedCodec;
use duraref_store::Backend;
use duraref_types::{OpOptions, RefKind, RefUri};
use serde_json::Value;

use crate::atomic::{AtomicRef, SwapFn};
use crate::error::{RefError, RefResult};
use crate::readonly::ReadOnlyRef;
use crate::value::ValueRef;
use crate::volatile::VolatileRef;

/// Read and decode the bytes at a URI. `Ok(None)` means Absent.
pub(crate) fn fetch_decoded(
    backend: &Arc<dyn Backend>,
    codec: &ResolvedCodec,
    uri: &RefUri,
    opts: &OpOptions,
) -> RefResult<Option<Arc<Value>>> {
    let Some(bytes) = backend.read(uri.inner(), opts)? else {
        return Ok(None);
    };
    let fopts = opts.format_read_opts(codec.format());
    Ok(Some(Arc::new(codec.decode(&bytes, &fopts)?)))
}

/// Encode a value with the write-scoped format options.
pub(crate) fn encode_for_write(
    codec: &ResolvedCodec,
    value: &Value,
    opts: &OpOptions,
) -> RefResult<Vec<u8>> {
    let fopts = opts.format_write_opts(codec.format());
    Ok(codec.encode(value, &fopts)?)
}

/// A typed, URI-addressed handle to a value living outside the process.
///
/// Equality and hashing derive solely from kind and URI; cached values,
/// origin back-links and interning status do not participate.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Ref {
    /// Immutable, content-addressed, cached, interned.
    Value(ValueRef),
    /// Mutable without concurrency coordination.
    Volatile(VolatileRef),
    /// Mutable with compare-and-swap support.
    Atomic(AtomicRef),
    /// Bare inner URI with read-only semantics.
    ReadOnly(ReadOnlyRef),
}

impl Ref {
    /// The reference URI.
    pub fn uri(&self) -> &RefUri {
        match self {
            Self::Value(r) => r.uri(),
            Self::Volatile(r) => r.uri(),
            Self::Atomic(r) => r.uri(),
            Self::ReadOnly(r) => r.uri(),
        }
    }

    /// The reference kind.
    pub fn kind(&self) -> RefKind {
        self.uri().kind()
    }

    /// Whether this reference rejects mutation.
    pub fn is_read_only(&self) -> bool {
        self.kind().is_read_only()
    }

    /// The current value.
    ///
    /// For value references, Absent storage is an error
    /// ([`RefError::MissingValue`]): a content-addressed blob that is gone
    /// is a broken reference, not an empty one. For the mutable and
    /// read-only kinds, `Ok(None)` means Absent.
    pub fn value(&self, opts: &OpOptions) -> RefResult<Option<Arc<Value>>> {
        match self {
            Self::Value(r) => r.deref(opts).map(Some),
            Self::Volatile(r) => r.read(opts),
            Self::Atomic(r) => r.read(opts),
            Self::ReadOnly(r) => r.read(opts),
        }
    }

    /// Encode and write a new value. Rejected by the read-only kinds.
    pub fn overwrite(&self, value: &Value, opts: &OpOptions) -> RefResult<()> {
        match self {
            Self::Volatile(r) => r.overwrite(value, opts),
            Self::Atomic(r) => r.overwrite(value, opts),
            Self::Value(_) | Self::ReadOnly(_) => Err(self.read_only_error("overwrite")),
        }
    }

    /// Delete the stored value. Rejected by the read-only kinds.
    pub fn delete(&self, opts: &OpOptions) -> RefResult<()> {
        match self {
            Self::Volatile(r) => r.delete(opts),
            Self::Atomic(r) => r.delete(opts),
            Self::Value(_) | Self::ReadOnly(_) => Err(self.read_only_error("delete")),
        }
    }

    /// Atomically replace the stored value with `f(current)`.
    ///
    /// Only atomic references support this; volatile references fail
    /// [`RefError::Unsupported`] and the read-only kinds fail
    /// [`RefError::ReadOnly`].
    pub fn atomic_swap(&self, f: &SwapFn, opts: &OpOptions) -> RefResult<Value> {
        match self {
            Self::Atomic(r) => r.swap_with(f, opts),
            Self::Volatile(_) => Err(RefError::Unsupported {
                uri: self.uri().to_string(),
                op: "atomic_swap",
            }),
            Self::Value(_) | Self::ReadOnly(_) => Err(self.read_only_error("atomic_swap")),
        }
    }

    /// Clear the decoded-value cache. A no-op for the uncached kinds.
    pub fn evict(&self) {
        if let Self::Value(r) = self {
            r.evict();
        }
    }

    /// This reference as a value reference, if it is one.
    pub fn as_value(&self) -> Option<&ValueRef> {
        match self {
            Self::Value(r) => Some(r),
            _ => None,
        }
    }

    fn read_only_error(&self, op: &'static str) -> RefError {
        RefError::ReadOnly {
            uri: self.uri().to_string(),
            op,
        }
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(r) => fmt::Debug::fmt(r, f),
            Self::Volatile(r) => fmt::Debug::fmt(r, f),
            Self::Atomic(r) => fmt::Debug::fmt(r, f),
            Self::ReadOnly(r) => fmt::Debug::fmt(r, f),
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

impl From<ValueRef> for Ref {
    fn from(r: ValueRef) -> Self {
        Self::Value(r)
    }
}

impl From<VolatileRef> for Ref {
    fn from(r: VolatileRef) -> Self {
        Self::Volatile(r)
    }
}

impl From<AtomicRef> for Ref {
    fn from(r: AtomicRef) -> Self {
        Self::Atomic(r)
    }
}

impl From<ReadOnlyRef> for Ref {
    fn from(r: ReadOnlyRef) -> Self {
        Self::ReadOnly(r)
    }
}
