//! Reference kinds for the duraref reference system.
//!
//! A durable reference is a typed, URI-addressed handle to a value that
//! lives outside the process. This crate implements the four kinds and the
//! machinery they share:
//!
//! - [`ValueRef`] — immutable, content-addressed, cached, interned
//! - [`VolatileRef`] — mutable, uncached, last-writer-wins
//! - [`AtomicRef`] — mutable, uncached, compare-and-swap
//! - [`ReadOnlyRef`] — bare inner URI, read-only
//! - [`Ref`] — one enum over all four
//! - [`Runtime`] — registries, weak intern pool, origin back-links and
//!   the hash-verification toggle
//!
//! # Design Rules
//!
//! 1. Value blobs are immutable; the SHA-1 in the URI names the bytes.
//! 2. One canonical value reference per URI while any alias is live.
//! 3. Cache population is serialized per reference; one decode per miss.
//! 4. The intern pool holds weak handles only and never keeps a
//!    reference alive.
//! 5. The CAS loop is optimistic and unbounded unless the back-off hook
//!    aborts.
//! 6. All errors surface to the caller; nothing is silently swallowed.

pub mod atomic;
pub mod error;
mod intern;
pub mod readonly;
pub mod reference;
pub mod runtime;
pub mod value;
pub mod volatile;

pub use atomic::{AtomicRef, SwapFn};
pub use error::{RefError, RefResult};
pub use readonly::ReadOnlyRef;
pub use reference::Ref;
pub use runtime::{PersistOptions, Runtime, DEFAULT_FORMAT};
pub use value::ValueRef;
pub use volatile::VolatileRef;
