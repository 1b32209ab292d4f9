//! Per-operation options.
//!
//! Options form an open, nested configuration tree scoped by scheme and by
//! format. The core never interprets adapter-scoped entries; it forwards the
//! merged maps to the backend or codec they address.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Open key-value options forwarded to a single adapter.
pub type OptMap = serde_json::Map<String, serde_json::Value>;

/// Raised by a CAS back-off hook to stop retrying.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("back-off aborted: {reason}")]
pub struct BackoffAbort {
    pub reason: String,
}

impl BackoffAbort {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Hook invoked between CAS retries with the 1-based retry index.
///
/// Returning `Err` aborts the swap; otherwise retries are unbounded. The
/// hook is where callers sleep, jitter, or count.
pub type BackoffHook = Arc<dyn Fn(u32) -> Result<(), BackoffAbort> + Send + Sync>;

/// Options scoped to one adapter (a backend scheme or a codec format).
#[derive(Clone, Debug, Default)]
pub struct AdapterOptions {
    /// Options applied to reads only.
    pub read: OptMap,
    /// Options applied to writes only.
    pub write: OptMap,
    /// Options applied to deletes only.
    pub delete: OptMap,
    /// Options applied to every operation, overlaid by the per-op maps.
    pub shared: OptMap,
    /// Adapter credentials, if the adapter needs any.
    pub credentials: Option<OptMap>,
}

impl AdapterOptions {
    /// Shared options overlaid with the read-specific ones.
    pub fn merged_read(&self) -> OptMap {
        merge(&self.shared, &self.read)
    }

    /// Shared options overlaid with the write-specific ones.
    pub fn merged_write(&self) -> OptMap {
        merge(&self.shared, &self.write)
    }

    /// Shared options overlaid with the delete-specific ones.
    pub fn merged_delete(&self) -> OptMap {
        merge(&self.shared, &self.delete)
    }
}

fn merge(base: &OptMap, overlay: &OptMap) -> OptMap {
    let mut out = base.clone();
    for (k, v) in overlay {
        out.insert(k.clone(), v.clone());
    }
    out
}

/// Options for a single reference operation.
///
/// Everything is optional; `OpOptions::default()` is the common case.
#[derive(Clone, Default)]
pub struct OpOptions {
    /// Request a strongly-consistent read where the backend distinguishes.
    pub consistent: bool,
    /// Adapter options keyed by backend scheme name.
    pub schemes: BTreeMap<String, AdapterOptions>,
    /// Adapter options keyed by codec format name.
    pub formats: BTreeMap<String, AdapterOptions>,
    /// Back-off hook for the generic CAS loop.
    pub cas_backoff: Option<BackoffHook>,
}

impl OpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options scoped to the given backend scheme, if any were supplied.
    pub fn scheme(&self, scheme: &str) -> Option<&AdapterOptions> {
        self.schemes.get(scheme)
    }

    /// Options scoped to the given codec format, if any were supplied.
    pub fn format(&self, format: &str) -> Option<&AdapterOptions> {
        self.formats.get(format)
    }

    /// Merged read options for a codec format (empty if none supplied).
    pub fn format_read_opts(&self, format: &str) -> OptMap {
        self.format(format)
            .map(AdapterOptions::merged_read)
            .unwrap_or_default()
    }

    /// Merged write options for a codec format (empty if none supplied).
    pub fn format_write_opts(&self, format: &str) -> OptMap {
        self.format(format)
            .map(AdapterOptions::merged_write)
            .unwrap_or_default()
    }

    pub fn with_consistent(mut self, consistent: bool) -> Self {
        self.consistent = consistent;
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>, opts: AdapterOptions) -> Self {
        self.schemes.insert(scheme.into(), opts);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>, opts: AdapterOptions) -> Self {
        self.formats.insert(format.into(), opts);
        self
    }

    pub fn with_cas_backoff(mut self, hook: BackoffHook) -> Self {
        self.cas_backoff = Some(hook);
        self
    }
}

impl fmt::Debug for OpOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpOptions")
            .field("consistent", &self.consistent)
            .field("schemes", &self.schemes)
            .field("formats", &self.formats)
            .field("cas_backoff", &self.cas_backoff.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, serde_json::Value)]) -> OptMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn merged_read_overlays_shared() {
        let opts = AdapterOptions {
            shared: map(&[("timeout-ms", json!(100)), ("region", json!("a"))]),
            read: map(&[("timeout-ms", json!(250))]),
            ..Default::default()
        };
        let merged = opts.merged_read();
        assert_eq!(merged["timeout-ms"], json!(250));
        assert_eq!(merged["region"], json!("a"));
    }

    #[test]
    fn scoped_lookup() {
        let opts = OpOptions::new()
            .with_scheme("mem", AdapterOptions::default())
            .with_format("json", AdapterOptions::default());
        assert!(opts.scheme("mem").is_some());
        assert!(opts.scheme("s3").is_none());
        assert!(opts.format("json").is_some());
        assert!(opts.format_read_opts("missing").is_empty());
    }

    #[test]
    fn backoff_hook_carries_abort() {
        let hook: BackoffHook = Arc::new(|n| {
            if n > 3 {
                Err(BackoffAbort::new("limit"))
            } else {
                Ok(())
            }
        });
        let opts = OpOptions::new().with_cas_backoff(hook);
        let hook = opts.cas_backoff.as_ref().unwrap();
        assert!(hook(1).is_ok());
        assert_eq!(hook(4).unwrap_err().reason, "limit");
    }

    #[test]
    fn debug_omits_hook_body() {
        let opts = OpOptions::new().with_cas_backoff(Arc::new(|_| Ok(())));
        let dbg = format!("{opts:?}");
        assert!(dbg.contains("cas_backoff: true"));
    }
}
