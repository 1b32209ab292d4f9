//! Atomic references: mutable, uncached, compare-and-swap.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use duraref_codec::ResolvedCodec;
use duraref_store::{Backend, StoreError};
use duraref_types::{OpOptions, RefUri};
use serde_json::Value;
use tracing::trace;

use crate::error::{RefError, RefResult};
use crate::reference::{encode_for_write, fetch_decoded};

/// User function applied by an atomic swap: current value (absent when the
/// key does not exist) to replacement value.
pub type SwapFn = dyn Fn(Option<Value>) -> Value + Send + Sync;

/// A mutable reference supporting compare-and-swap.
///
/// Plain reads and writes behave like a volatile reference. `atomic_swap`
/// delegates to the backend's native transaction when it has one, and
/// otherwise runs a generic optimistic loop over the backend's versioned
/// primitives: read, apply, write under a version precondition, retry on
/// contention. Retries are unbounded unless the back-off hook in the
/// options aborts.
#[derive(Clone)]
pub struct AtomicRef {
    uri: RefUri,
    codec: ResolvedCodec,
    backend: Arc<dyn Backend>,
}

impl AtomicRef {
    pub(crate) fn new(uri: RefUri, codec: ResolvedCodec, backend: Arc<dyn Backend>) -> Self {
        Self { uri, codec, backend }
    }

    /// The reference URI.
    pub fn uri(&self) -> &RefUri {
        &self.uri
    }

    /// Read and decode the current value. `Ok(None)` means Absent.
    pub fn read(&self, opts: &OpOptions) -> RefResult<Option<Arc<Value>>> {
        fetch_decoded(&self.backend, &self.codec, &self.uri, opts)
    }

    /// Encode and write a new value, replacing any previous content.
    pub fn overwrite(&self, value: &Value, opts: &OpOptions) -> RefResult<()> {
        let bytes = encode_for_write(&self.codec, value, opts)?;
        self.backend.write(self.uri.inner(), &bytes, opts)?;
        Ok(())
    }

    /// Delete the stored value. Deleting a missing key succeeds.
    pub fn delete(&self, opts: &OpOptions) -> RefResult<()> {
        self.backend.delete(self.uri.inner(), opts)?;
        Ok(())
    }

    /// Unconditionally write `value` and return it.
    pub fn reset(&self, value: Value, opts: &OpOptions) -> RefResult<Value> {
        self.overwrite(&value, opts)?;
        Ok(value)
    }

    /// Atomically replace the stored value with `f(current)`.
    ///
    /// Each successful swap is linearizable with respect to the backend's
    /// own primitives. When `f` returns a value equal to the current one
    /// the write is skipped and the value returned as-is.
    pub fn atomic_swap<F>(&self, f: F, opts: &OpOptions) -> RefResult<Value>
    where
        F: Fn(Option<Value>) -> Value + Send + Sync + 'static,
    {
        self.swap_with(&f, opts)
    }

    pub(crate) fn swap_with(&self, f: &SwapFn, opts: &OpOptions) -> RefResult<Value> {
        if self.backend.supports_atomic_swap() {
            self.swap_native(f, opts)
        } else if self.backend.supports_versioning() {
            self.swap_generic(f, opts)
        } else {
            Err(RefError::Unsupported {
                uri: self.uri.to_string(),
                op: "atomic_swap",
            })
        }
    }

    /// Delegate to the backend's transactional swap, bridging between the
    /// decoded value domain and the backend's byte domain.
    fn swap_native(&self, f: &SwapFn, opts: &OpOptions) -> RefResult<Value> {
        let read_opts = opts.format_read_opts(self.codec.format());
        let write_opts = opts.format_write_opts(self.codec.format());
        let outcome: Mutex<Option<Value>> = Mutex::new(None);

        let apply = |previous: Option<Vec<u8>>| -> Result<Vec<u8>, StoreError> {
            let old = previous
                .map(|bytes| self.codec.decode(&bytes, &read_opts))
                .transpose()
                .map_err(|e| StoreError::Swap(e.to_string()))?;
            let new = f(old);
            let bytes = self
                .codec
                .encode(&new, &write_opts)
                .map_err(|e| StoreError::Swap(e.to_string()))?;
            *outcome.lock().expect("lock poisoned") = Some(new);
            Ok(bytes)
        };

        self.backend.atomic_swap(self.uri.inner(), &apply, opts)?;
        outcome
            .into_inner()
            .expect("lock poisoned")
            .ok_or_else(|| {
                RefError::Store(StoreError::Backend(
                    "atomic swap returned without applying the swap function".into(),
                ))
            })
    }

    /// Generic optimistic CAS over the versioned primitives.
    fn swap_generic(&self, f: &SwapFn, opts: &OpOptions) -> RefResult<Value> {
        let read_opts = opts.format_read_opts(self.codec.format());
        let write_opts = opts.format_write_opts(self.codec.format());
        // The loop's correctness requires observing the latest committed
        // version, so the read is always requested consistent.
        let consistent = opts.clone().with_consistent(true);
        let mut retries: u32 = 0;

        loop {
            let current = self.backend.read_versioned(self.uri.inner(), &consistent)?;
            let (old, expected) = match current {
                Some(versioned) => (
                    Some(self.codec.decode(&versioned.bytes, &read_opts)?),
                    Some(versioned.version),
                ),
                None => (None, None),
            };

            let new = f(old.clone());
            if old.as_ref() == Some(&new) {
                // Unchanged: nothing to write.
                return Ok(new);
            }

            let bytes = self.codec.encode(&new, &write_opts)?;
            if self
                .backend
                .write_versioned(self.uri.inner(), &bytes, expected, opts)?
            {
                return Ok(new);
            }

            retries += 1;
            trace!(uri = %self.uri, retries, "atomic swap lost the race, retrying");
            if let Some(hook) = &opts.cas_backoff {
                hook(retries).map_err(|abort| RefError::CasAborted {
                    retries,
                    reason: abort.reason,
                })?;
            }
        }
    }
}

impl PartialEq for AtomicRef {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for AtomicRef {}

impl Hash for AtomicRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.as_str().hash(state);
    }
}

impl fmt::Debug for AtomicRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicRef")
            .field("uri", &self.uri.as_str())
            .finish()
    }
}
