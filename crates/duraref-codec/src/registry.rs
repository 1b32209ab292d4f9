//! Format-suffix dispatch to codecs.
//!
//! Dispatch is on the rightmost dotted suffix of a path's last segment,
//! with fallback: given segment `a.b.c`, try `b.c` then `c`. A suffix may
//! resolve to a full codec or to a byte transform (compression wrapper);
//! transforms strip their own suffix and resolution continues on the
//! remainder, stacking wrappers over the eventual base codec. `data.json.gz`
//! therefore resolves to a dedicated `json.gz` codec when one is registered,
//! and otherwise to the `gz` transform wrapped around the `json` codec.

use std::collections::HashMap;
use std::sync::Arc;

use duraref_types::{InnerUri, OptMap};
use serde_json::Value;
use tracing::debug;

use crate::error::{CodecError, CodecResult};
use crate::traits::{ByteTransform, Codec};

enum Registration {
    Codec(Arc<dyn Codec>),
    Transform(Arc<dyn ByteTransform>),
}

/// Registry mapping format suffixes to codecs and transforms.
///
/// The registry is populated once at startup and is immutable afterwards;
/// shared behind an `Arc` it is safe to read from any thread.
#[derive(Default)]
pub struct CodecRegistry {
    entries: HashMap<String, Registration>,
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec under a format suffix (e.g. `json`).
    pub fn register_codec(&mut self, suffix: impl Into<String>, codec: Arc<dyn Codec>) {
        let suffix = suffix.into().to_ascii_lowercase();
        debug!(suffix = %suffix, "registered codec");
        self.entries.insert(suffix, Registration::Codec(codec));
    }

    /// Register a byte transform under a wrapper suffix (e.g. `gz`).
    pub fn register_transform(
        &mut self,
        suffix: impl Into<String>,
        transform: Arc<dyn ByteTransform>,
    ) {
        let suffix = suffix.into().to_ascii_lowercase();
        debug!(suffix = %suffix, "registered transform");
        self.entries
            .insert(suffix, Registration::Transform(transform));
    }

    /// Whether any registration exists for this exact suffix.
    pub fn contains(&self, suffix: &str) -> bool {
        self.entries.contains_key(suffix)
    }

    /// All registered suffixes, sorted.
    pub fn suffixes(&self) -> Vec<String> {
        let mut out: Vec<String> = self.entries.keys().cloned().collect();
        out.sort();
        out
    }

    /// Resolve the codec chain for a URI's last path segment.
    pub fn resolve_uri(&self, uri: &InnerUri) -> CodecResult<ResolvedCodec> {
        let candidates = uri.format_candidates();
        if candidates.is_empty() {
            return Err(CodecError::UnknownFormat {
                path: uri.as_str().to_string(),
            });
        }
        // The longest candidate spans the whole suffix portion; shorter
        // tails are retried inside resolve_format.
        self.resolve_format(candidates[0]).map_err(|e| match e {
            CodecError::UnknownFormat { .. } => CodecError::UnknownFormat {
                path: uri.as_str().to_string(),
            },
            other => other,
        })
    }

    /// Resolve the codec chain for an explicit format string (e.g.
    /// `json.gz`).
    pub fn resolve_format(&self, format: &str) -> CodecResult<ResolvedCodec> {
        let full = format.to_ascii_lowercase();
        let mut transforms: Vec<Arc<dyn ByteTransform>> = Vec::new();
        let mut remaining: &str = &full;

        'strip: loop {
            for tail in tails(remaining) {
                match self.entries.get(tail) {
                    Some(Registration::Codec(codec)) => {
                        return Ok(ResolvedCodec {
                            format: full.clone(),
                            base: Arc::clone(codec),
                            transforms,
                        });
                    }
                    Some(Registration::Transform(transform)) => {
                        transforms.push(Arc::clone(transform));
                        // Strip ".{tail}"; a bare transform has no base.
                        let keep = remaining.len() - tail.len();
                        if keep == 0 {
                            return Err(CodecError::NoBaseCodec {
                                format: full.clone(),
                            });
                        }
                        remaining = &remaining[..keep - 1];
                        continue 'strip;
                    }
                    None => {}
                }
            }
            return Err(CodecError::UnknownFormat { path: full });
        }
    }

    /// Encode a value in the named format.
    pub fn encode(&self, value: &Value, format: &str, opts: &OptMap) -> CodecResult<Vec<u8>> {
        self.resolve_format(format)?.encode(value, opts)
    }

    /// Decode bytes in the named format.
    pub fn decode(&self, bytes: &[u8], format: &str, opts: &OptMap) -> CodecResult<Value> {
        self.resolve_format(format)?.decode(bytes, opts)
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("suffixes", &self.suffixes())
            .finish()
    }
}

/// Dot-separated tails of a format string, longest first, including the
/// whole string: `"json.gz"` yields `["json.gz", "gz"]`.
fn tails(s: &str) -> impl Iterator<Item = &str> {
    std::iter::once(s).chain(
        s.char_indices()
            .filter(|&(_, c)| c == '.')
            .map(move |(i, _)| &s[i + 1..])
            .filter(|t| !t.is_empty()),
    )
}

/// A resolved encoder/decoder chain: one base codec plus zero or more
/// byte transforms, outermost first.
#[derive(Clone)]
pub struct ResolvedCodec {
    format: String,
    base: Arc<dyn Codec>,
    transforms: Vec<Arc<dyn ByteTransform>>,
}

impl ResolvedCodec {
    /// The full format string this chain was resolved from.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Encode: base codec first, then transforms innermost to outermost.
    pub fn encode(&self, value: &Value, opts: &OptMap) -> CodecResult<Vec<u8>> {
        let mut bytes = self.base.encode(value, opts)?;
        for transform in self.transforms.iter().rev() {
            bytes = transform.apply(&bytes, opts)?;
        }
        Ok(bytes)
    }

    /// Decode: transforms outermost to innermost, then the base codec.
    pub fn decode(&self, bytes: &[u8], opts: &OptMap) -> CodecResult<Value> {
        if self.transforms.is_empty() {
            return self.base.decode(bytes, opts);
        }
        let mut current = bytes.to_vec();
        for transform in &self.transforms {
            current = transform.invert(&current, opts)?;
        }
        self.base.decode(&current, opts)
    }
}

impl std::fmt::Debug for ResolvedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCodec")
            .field("format", &self.format)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}
