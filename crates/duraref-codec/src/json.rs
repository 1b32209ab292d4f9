use duraref_types::OptMap;
use serde_json::Value;

use crate::error::{CodecError, CodecResult};
use crate::traits::Codec;

/// JSON codec backed by `serde_json`.
///
/// Output is compact by default; pass `{"pretty": true}` in the format
/// options to emit indented text. Pretty and compact output decode to the
/// same value, but they hash differently, so the option matters for
/// content-addressed writes.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// The suffix this codec is conventionally registered under.
    pub const SUFFIX: &'static str = "json";

    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn encode(&self, value: &Value, opts: &OptMap) -> CodecResult<Vec<u8>> {
        let pretty = opts.get("pretty").and_then(Value::as_bool).unwrap_or(false);
        let result = if pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        result.map_err(|e| CodecError::Encode {
            format: Self::SUFFIX.into(),
            reason: e.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8], _opts: &OptMap) -> CodecResult<Value> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
            format: Self::SUFFIX.into(),
            reason: e.to_string(),
        })
    }
}
