//! Codec layer for durable references.
//!
//! A codec turns in-memory values into bytes and back; which codec applies
//! is decided by the dotted format suffix of a reference URI's last path
//! segment. This crate provides:
//!
//! - [`Codec`] and [`ByteTransform`] — the encode/decode and compression
//!   wrapper contracts
//! - [`CodecRegistry`] — rightmost-suffix dispatch with fallback, stacking
//!   transforms over a base codec
//! - [`JsonCodec`] — `serde_json` text codec (`json`)
//! - [`GzipTransform`] — `flate2` compression wrapper (`gz`)
//!
//! Codecs are referentially pure; the registry is write-once after startup
//! and safe for concurrent reads.

pub mod error;
pub mod gzip;
pub mod json;
pub mod registry;
pub mod traits;

pub use error::{CodecError, CodecResult};
pub use gzip::GzipTransform;
pub use json::JsonCodec;
pub use registry::{CodecRegistry, ResolvedCodec};
pub use traits::{ByteTransform, Codec};
