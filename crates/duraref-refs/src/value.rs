//! Value references: immutable, content-addressed, cached, interned.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, RwLock};

use duraref_codec::ResolvedCodec;
use duraref_store::Backend;
use duraref_types::{ContentHash, OpOptions, RefUri};
use serde_json::Value;
use tracing::trace;

use crate::error::{RefError, RefResult};
use crate::runtime::Runtime;

/// Shared state of one canonical value reference.
///
/// All aliases of a URI hold the same `ValueShared` through the intern
/// pool, so the decoded cache is shared process-wide.
pub(crate) struct ValueShared {
    pub(crate) runtime: Arc<Runtime>,
    pub(crate) uri: RefUri,
    pub(crate) codec: ResolvedCodec,
    pub(crate) backend: Arc<dyn Backend>,
    /// Decoded value, once populated. Readers take the fast path; the
    /// populate mutex serializes the miss path.
    cache: RwLock<Option<Arc<Value>>>,
    populate: Mutex<()>,
}

impl ValueShared {
    /// Whether the cache currently holds this exact allocation.
    pub(crate) fn holds(&self, value: &Arc<Value>) -> bool {
        self.cache
            .read()
            .expect("lock poisoned")
            .as_ref()
            .map(|cached| Arc::ptr_eq(cached, value))
            .unwrap_or(false)
    }
}

impl Drop for ValueShared {
    fn drop(&mut self) {
        // Last strong handle is gone: release the origin back-link for the
        // cached value and the (now dead) intern entry. Locks must not be
        // poisoned-checked with a panic inside drop.
        if let Ok(slot) = self.cache.get_mut() {
            if let Some(value) = slot.take() {
                self.runtime.origins.remove(&value);
            }
        }
        self.runtime.intern.purge(self.uri.as_str());
    }
}

/// An immutable, content-addressed, cached, interned reference.
///
/// Cloning is cheap and aliases the same canonical state. The decoded
/// value is fetched once per cache miss, verified against the SHA-1 the
/// URI names, and shared by every alias until [`ValueRef::evict`].
#[derive(Clone)]
pub struct ValueRef {
    shared: Arc<ValueShared>,
}

impl ValueRef {
    pub(crate) fn new(
        runtime: Arc<Runtime>,
        uri: RefUri,
        codec: ResolvedCodec,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            shared: Arc::new(ValueShared {
                runtime,
                uri,
                codec,
                backend,
                cache: RwLock::new(None),
                populate: Mutex::new(()),
            }),
        }
    }

    /// Construct with the cache pre-populated, as `persist` does: the
    /// encoder's input is retained, avoiding a decode round-trip.
    pub(crate) fn with_cached(
        runtime: Arc<Runtime>,
        uri: RefUri,
        codec: ResolvedCodec,
        backend: Arc<dyn Backend>,
        value: Arc<Value>,
    ) -> Self {
        let shared = Arc::new(ValueShared {
            runtime,
            uri,
            codec,
            backend,
            cache: RwLock::new(Some(Arc::clone(&value))),
            populate: Mutex::new(()),
        });
        shared.runtime.origins.record(&value, &shared);
        Self { shared }
    }

    pub(crate) fn from_shared(shared: Arc<ValueShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Arc<ValueShared> {
        &self.shared
    }

    /// The reference URI.
    pub fn uri(&self) -> &RefUri {
        &self.shared.uri
    }

    /// The cached decoded value, if populated. Never touches storage.
    pub fn cached(&self) -> Option<Arc<Value>> {
        self.shared.cache.read().expect("lock poisoned").clone()
    }

    /// Whether two references alias the same canonical instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Dereference: return the cached value, reading and verifying from
    /// storage on a miss.
    ///
    /// The miss path is serialized per reference; concurrent callers see
    /// at most one read+decode. Fails with [`RefError::MissingValue`] when
    /// storage has no bytes and [`RefError::ChecksumMismatch`] when the
    /// bytes no longer hash to the digest the URI names (externally
    /// mutated storage).
    pub fn deref(&self, opts: &OpOptions) -> RefResult<Arc<Value>> {
        if let Some(value) = self.shared.cache.read().expect("lock poisoned").as_ref() {
            return Ok(Arc::clone(value));
        }

        let _populating = self.shared.populate.lock().expect("lock poisoned");
        // Double-checked: another caller may have populated while we
        // waited on the mutex.
        if let Some(value) = self.shared.cache.read().expect("lock poisoned").as_ref() {
            return Ok(Arc::clone(value));
        }

        let bytes = self
            .shared
            .backend
            .read(self.shared.uri.inner(), opts)?
            .ok_or_else(|| RefError::MissingValue {
                uri: self.shared.uri.to_string(),
            })?;

        if self.shared.runtime.hash_verification() {
            let computed = ContentHash::of(&bytes);
            if !computed.matches_uri(&self.shared.uri) {
                return Err(RefError::ChecksumMismatch {
                    uri: self.shared.uri.to_string(),
                    computed: computed.to_hex(),
                });
            }
        }

        let fopts = opts.format_read_opts(self.shared.codec.format());
        let value = Arc::new(self.shared.codec.decode(&bytes, &fopts)?);
        *self.shared.cache.write().expect("lock poisoned") = Some(Arc::clone(&value));
        self.shared.runtime.origins.record(&value, &self.shared);
        trace!(uri = %self.shared.uri, "populated value cache");
        Ok(value)
    }

    /// Clear the cache cell. The next `deref` re-reads and re-verifies.
    pub fn evict(&self) {
        let taken = self.shared.cache.write().expect("lock poisoned").take();
        if let Some(value) = taken {
            self.shared.runtime.origins.remove(&value);
        }
    }
}

impl PartialEq for ValueRef {
    fn eq(&self, other: &Self) -> bool {
        self.shared.uri == other.shared.uri
    }
}

impl Eq for ValueRef {}

impl Hash for ValueRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shared.uri.as_str().hash(state);
    }
}

impl fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRef")
            .field("uri", &self.shared.uri.as_str())
            .field("cached", &self.cached().is_some())
            .finish()
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.shared.uri)
    }
}
