//! Durable references: typed, URI-addressed handles to values that live
//! outside the process.
//!
//! A reference URI names a kind, a storage backend and a codec in one
//! string:
//!
//! ```text
//! value:mem://bucket/<sha1-hex>.json     immutable, cached, interned
//! volatile:mem://bucket/doc.json         mutable, last-writer-wins
//! atomic:mem://bucket/ctr.json           mutable, compare-and-swap
//! mem://bucket/doc.json                  read-only view
//! ```
//!
//! This crate is the entry point: it re-exports the public surface of the
//! component crates and wires a [`standard_runtime`] with the JSON codec,
//! the gzip wrapper and the in-memory backend.
//!
//! # Example
//!
//! ```
//! use duraref::{standard_runtime, OpOptions, PersistOptions};
//! use serde_json::json;
//!
//! let rt = standard_runtime();
//! let r = rt.persist("mem://tmp", json!(42), &PersistOptions::new()).unwrap();
//! assert_eq!(*r.deref(&OpOptions::default()).unwrap(), json!(42));
//! ```

use std::sync::Arc;

pub use duraref_codec::{
    ByteTransform, Codec, CodecError, CodecRegistry, GzipTransform, JsonCodec, ResolvedCodec,
};
pub use duraref_refs::{
    AtomicRef, PersistOptions, ReadOnlyRef, Ref, RefError, RefResult, Runtime, SwapFn, ValueRef,
    VolatileRef, DEFAULT_FORMAT,
};
pub use duraref_store::{
    Backend, BackendRegistry, ByteSwapFn, MemoryBackend, StoreError, StoreResult, Versioned,
};
pub use duraref_types::{
    AdapterOptions, BackoffAbort, BackoffHook, ContentHash, InnerUri, OpOptions, OptMap, RefKind,
    RefUri, UriError,
};

/// A runtime with the standard wiring: JSON codec (`json`), gzip wrapper
/// (`gz`), and the in-memory backend (`mem`).
///
/// Embedders with their own adapters build registries by hand and call
/// [`Runtime::new`].
pub fn standard_runtime() -> Arc<Runtime> {
    let mut codecs = CodecRegistry::new();
    codecs.register_codec(JsonCodec::SUFFIX, Arc::new(JsonCodec::new()));
    codecs.register_transform(GzipTransform::SUFFIX, Arc::new(GzipTransform::new()));

    let mut backends = BackendRegistry::new();
    backends.register(Arc::new(MemoryBackend::new()));

    Runtime::new(codecs, backends)
}
