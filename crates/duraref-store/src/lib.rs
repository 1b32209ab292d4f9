//! Backend layer for durable references.
//!
//! A backend stores opaque bytes under inner URIs; which backend applies is
//! decided by the inner scheme of a reference URI. This crate provides:
//!
//! - [`Backend`] — the byte-level primitive contract: read/write/delete,
//!   plus optional versioned reads, precondition writes, and native atomic
//!   swap
//! - [`BackendRegistry`] — inner-scheme dispatch, write-once after startup
//! - [`MemoryBackend`] — `HashMap`-based backend for tests and embedding
//!   (scheme `mem`)
//!
//! # Design Rules
//!
//! 1. `Ok(None)` on read means Absent and is distinct from an error.
//! 2. Writes are durable by the time they return successfully.
//! 3. Deleting a missing key is not an error.
//! 4. Versions are monotonic per key and never reused, so an observed
//!    version is a valid compare-and-swap precondition token.
//! 5. The backend never interprets stored bytes.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod registry;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryBackend;
pub use registry::BackendRegistry;
pub use traits::{Backend, ByteSwapFn, Versioned};
