//! Inner-scheme dispatch to backends.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::Backend;

/// Registry mapping inner-scheme names to backend adapters.
///
/// Populated once at startup and immutable afterwards; shared behind an
/// `Arc` it is safe to read from any thread. The registry only dispatches —
/// retrying, queueing and connection pooling are adapter concerns.
#[derive(Default)]
pub struct BackendRegistry {
    entries: HashMap<String, Arc<dyn Backend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own scheme name.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        let scheme = backend.scheme().to_ascii_lowercase();
        debug!(scheme = %scheme, "registered backend");
        self.entries.insert(scheme, backend);
    }

    /// Look up the backend for an inner scheme.
    pub fn get(&self, scheme: &str) -> StoreResult<Arc<dyn Backend>> {
        self.entries
            .get(scheme)
            .cloned()
            .ok_or_else(|| StoreError::UnknownScheme {
                scheme: scheme.to_string(),
            })
    }

    /// Whether a backend is registered for this scheme.
    pub fn contains(&self, scheme: &str) -> bool {
        self.entries.contains_key(scheme)
    }

    /// All registered scheme names, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut out: Vec<String> = self.entries.keys().cloned().collect();
        out.sort();
        out
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[test]
    fn register_and_get() {
        let mut reg = BackendRegistry::new();
        reg.register(Arc::new(MemoryBackend::new()));
        assert!(reg.contains("mem"));
        assert!(reg.get("mem").is_ok());
    }

    #[test]
    fn unknown_scheme() {
        let reg = BackendRegistry::new();
        let err = reg.get("s3").unwrap_err();
        match err {
            StoreError::UnknownScheme { scheme } => assert_eq!(scheme, "s3"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn schemes_sorted() {
        let mut reg = BackendRegistry::new();
        reg.register(Arc::new(MemoryBackend::new()));
        assert_eq!(reg.schemes(), vec!["mem".to_string()]);
    }
}
