use std::io::{Read, Write};

use duraref_types::OptMap;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::error::{CodecError, CodecResult};
use crate::traits::ByteTransform;

/// Gzip compression wrapper backed by `flate2`.
///
/// Registered as a transform under the `gz` suffix, it stacks over whatever
/// base codec the remaining suffix resolves to. The compression level can be
/// overridden per operation with `{"level": 0..=9}` in the format options.
#[derive(Clone, Copy, Debug)]
pub struct GzipTransform {
    level: Compression,
}

impl GzipTransform {
    /// The suffix this transform is conventionally registered under.
    pub const SUFFIX: &'static str = "gz";

    /// Default compression level.
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Fixed compression level, 0 (store) to 9 (best).
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }

    fn level_for(&self, opts: &OptMap) -> Compression {
        opts.get("level")
            .and_then(Value::as_u64)
            .map(|l| Compression::new(l.min(9) as u32))
            .unwrap_or(self.level)
    }
}

impl Default for GzipTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteTransform for GzipTransform {
    fn apply(&self, bytes: &[u8], opts: &OptMap) -> CodecResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level_for(opts));
        encoder
            .write_all(bytes)
            .and_then(|_| encoder.finish())
            .map_err(|e| CodecError::Encode {
                format: Self::SUFFIX.into(),
                reason: e.to_string(),
            })
    }

    fn invert(&self, bytes: &[u8], _opts: &OptMap) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decode {
                format: Self::SUFFIX.into(),
                reason: e.to_string(),
            })?;
        Ok(out)
    }
}
