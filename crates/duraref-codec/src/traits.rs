//! The codec and byte-transform contracts.

use duraref_types::OptMap;
use serde_json::Value;

use crate::error::CodecResult;

/// Encoder/decoder pair for one serialization format.
///
/// Codecs must be referentially pure: given the same value and options they
/// produce equal bytes, and `decode(encode(v)) == v` for every value the
/// codec claims to support. The core performs no caching of codec work
/// beyond the value cache cell, so impure codecs would silently break
/// content addressing.
pub trait Codec: Send + Sync {
    /// Encode a value to bytes.
    fn encode(&self, value: &Value, opts: &OptMap) -> CodecResult<Vec<u8>>;

    /// Decode bytes back to a value.
    fn decode(&self, bytes: &[u8], opts: &OptMap) -> CodecResult<Value>;
}

/// A pure bytes-to-bytes transform, stacked over a base codec.
///
/// Transforms model compression wrappers and similar suffixes (`.gz`):
/// `apply` runs after the base codec's encode, `invert` runs before its
/// decode. `invert(apply(b)) == b` must hold for all byte strings.
pub trait ByteTransform: Send + Sync {
    /// Transform encoded bytes (e.g. compress).
    fn apply(&self, bytes: &[u8], opts: &OptMap) -> CodecResult<Vec<u8>>;

    /// Undo the transform (e.g. decompress).
    fn invert(&self, bytes: &[u8], opts: &OptMap) -> CodecResult<Vec<u8>>;
}
