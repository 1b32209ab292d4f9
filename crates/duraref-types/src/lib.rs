//! Foundation types for the duraref reference system.
//!
//! This crate provides the URI model, content hashing, and operation options
//! shared by every other duraref crate.
//!
//! # Key Types
//!
//! - [`RefUri`] — parsed, lowercase-normalized reference URI
//! - [`RefKind`] — Value / Volatile / Atomic / ReadOnly classification
//! - [`InnerUri`] — the transport URI obtained by stripping the kind prefix
//! - [`ContentHash`] — SHA-1 digest for content-addressed naming
//! - [`OpOptions`] — per-operation options, scoped by scheme and format

pub mod error;
pub mod hash;
pub mod opts;
pub mod uri;

pub use error::{HashError, UriError, UriResult};
pub use hash::ContentHash;
pub use opts::{AdapterOptions, BackoffAbort, BackoffHook, OpOptions, OptMap};
pub use uri::{InnerUri, RefKind, RefUri};
