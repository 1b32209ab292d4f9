//! The runtime binding registries, intern pool and verification policy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use duraref_codec::CodecRegistry;
use duraref_store::BackendRegistry;
use duraref_types::{ContentHash, OpOptions, RefKind, RefUri};
use serde_json::Value;
use tracing::debug;

use crate::atomic::AtomicRef;
use crate::error::RefResult;
use crate::intern::{InternPool, OriginRegistry};
use crate::readonly::ReadOnlyRef;
use crate::reference::Ref;
use crate::value::ValueRef;
use crate::volatile::VolatileRef;

/// Format used by `persist` when the caller does not name one.
pub const DEFAULT_FORMAT: &str = "json";

/// Options for a `persist` call.
#[derive(Clone, Debug, Default)]
pub struct PersistOptions {
    /// Format suffix for the encoded blob (default [`DEFAULT_FORMAT`]).
    pub format: Option<String>,
    /// Options forwarded to the codec and backend.
    pub op: OpOptions,
}

impl PersistOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_op(mut self, op: OpOptions) -> Self {
        self.op = op;
        self
    }
}

/// One reference system: codec and backend registries, the intern pool,
/// the origin back-links, and the hash-verification toggle.
///
/// Registries are frozen at construction and safe to read from any thread.
/// The pool and origin map are the only mutable state and are scoped to
/// the runtime, so tests run isolated instances. Use through an
/// `Arc<Runtime>`; constructed references keep a handle to their runtime.
pub struct Runtime {
    codecs: CodecRegistry,
    backends: BackendRegistry,
    pub(crate) intern: InternPool,
    pub(crate) origins: OriginRegistry,
    verify_hashes: AtomicBool,
    /// Weak self-handle so `&self` methods can hand references a strong
    /// runtime handle. Constructed references keep the runtime alive, not
    /// the other way around.
    handle: Weak<Runtime>,
}

impl Runtime {
    /// Create a runtime over frozen registries. Hash verification starts
    /// enabled.
    pub fn new(codecs: CodecRegistry, backends: BackendRegistry) -> Arc<Self> {
        Arc::new_cyclic(|handle| Self {
            codecs,
            backends,
            intern: InternPool::new(),
            origins: OriginRegistry::new(),
            verify_hashes: AtomicBool::new(true),
            handle: handle.clone(),
        })
    }

    fn strong(&self) -> Arc<Runtime> {
        // Runtime is only ever constructed through `new`, so a live `&self`
        // implies a live Arc.
        self.handle.upgrade().expect("runtime constructed via Runtime::new")
    }

    /// The codec registry.
    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// The backend registry.
    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    /// Whether value dereferences verify the SHA-1 named by the URI.
    pub fn hash_verification(&self) -> bool {
        self.verify_hashes.load(Ordering::Relaxed)
    }

    /// Toggle hash verification. Disabling it is a recognized deployment
    /// option for trusted storage.
    pub fn set_hash_verification(&self, on: bool) {
        self.verify_hashes.store(on, Ordering::Relaxed);
    }

    /// Parse a reference URI and construct the reference it describes.
    ///
    /// The codec chain and backend are resolved eagerly, so unknown
    /// formats and schemes fail here rather than at first use. Value
    /// references come back interned: the same URI yields the same
    /// canonical instance while any alias is live.
    pub fn reference(&self, uri: &str) -> RefResult<Ref> {
        let parsed = RefUri::parse(uri)?;
        self.from_uri(parsed)
    }

    /// Construct a reference from an already-parsed URI.
    pub fn from_uri(&self, uri: RefUri) -> RefResult<Ref> {
        let codec = self.codecs.resolve_uri(uri.inner())?;
        let backend = self.backends.get(uri.inner().scheme())?;
        Ok(match uri.kind() {
            RefKind::Value => {
                let candidate = ValueRef::new(self.strong(), uri, codec, backend);
                Ref::Value(self.intern.intern(candidate))
            }
            RefKind::Volatile => Ref::Volatile(VolatileRef::new(uri, codec, backend)),
            RefKind::Atomic => Ref::Atomic(AtomicRef::new(uri, codec, backend)),
            RefKind::ReadOnly => Ref::ReadOnly(ReadOnlyRef::new(uri, codec, backend)),
        })
    }

    /// Persist a value under a content-addressed child of `base`.
    ///
    /// Encodes, hashes, derives `value:<base>/<sha1-hex>.<format>`, writes
    /// the blob, and returns the interned reference with its cache
    /// pre-populated from the encoder's input. When the canonical
    /// reference for that URI is already live the write is skipped: the
    /// blob is by construction already present or already being written by
    /// the live holder.
    pub fn persist(&self, base: &str, value: Value, opts: &PersistOptions) -> RefResult<ValueRef> {
        let format = opts
            .format
            .as_deref()
            .unwrap_or(DEFAULT_FORMAT)
            .to_ascii_lowercase();
        let codec = self.codecs.resolve_format(&format)?;
        let fopts = opts.op.format_write_opts(codec.format());
        let bytes = codec.encode(&value, &fopts)?;
        let digest = ContentHash::of(&bytes);

        let text = format!(
            "value:{}/{}.{}",
            base.trim().trim_end_matches('/').to_ascii_lowercase(),
            digest.to_hex(),
            format,
        );
        let uri = RefUri::parse(&text)?;
        let backend = self.backends.get(uri.inner().scheme())?;

        if let Some(canonical) = self.intern.get(uri.as_str()) {
            debug!(uri = %uri, "persist found live canonical reference, skipping write");
            return Ok(canonical);
        }

        backend.write(uri.inner(), &bytes, &opts.op)?;
        let candidate = ValueRef::with_cached(self.strong(), uri, codec, backend, Arc::new(value));
        Ok(self.intern.intern(candidate))
    }

    /// Parse a URI and read its current value.
    pub fn value(&self, uri: &str, opts: &OpOptions) -> RefResult<Option<Arc<Value>>> {
        self.reference(uri)?.value(opts)
    }

    /// Parse a URI and overwrite its value.
    pub fn overwrite(&self, uri: &str, value: &Value, opts: &OpOptions) -> RefResult<()> {
        self.reference(uri)?.overwrite(value, opts)
    }

    /// Parse a URI and delete its value.
    pub fn delete(&self, uri: &str, opts: &OpOptions) -> RefResult<()> {
        self.reference(uri)?.delete(opts)
    }

    /// Whether a live canonical reference exists for this reference's URI.
    pub fn is_interned(&self, reference: &ValueRef) -> bool {
        self.intern.is_interned(reference.uri().as_str())
    }

    /// Recover the reference a decoded value came from.
    ///
    /// Returns the originating value reference iff it is still live and
    /// its cache still holds exactly this value.
    pub fn existing_ref(&self, value: &Arc<Value>) -> Option<ValueRef> {
        let shared = self.origins.lookup(value)?;
        shared.holds(value).then(|| ValueRef::from_shared(shared))
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("codecs", &self.codecs)
            .field("backends", &self.backends)
            .field("verify_hashes", &self.hash_verification())
            .finish()
    }
}
