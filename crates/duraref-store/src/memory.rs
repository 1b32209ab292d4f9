use std::collections::HashMap;
use std::sync::RwLock;

use duraref_types::{InnerUri, OpOptions};

use crate::error::StoreResult;
use crate::traits::{Backend, Versioned};

/// One stored blob and its version counter.
///
/// Versions survive overwrites within a slot's lifetime; a delete removes
/// the slot, and `next_version` on the backend keeps the counter globally
/// monotonic so a delete/recreate cycle can never reissue an observed
/// version.
#[derive(Clone, Debug)]
struct Slot {
    bytes: Vec<u8>,
    version: u64,
}

/// In-memory, HashMap-based backend for the `mem` scheme.
///
/// Intended for tests and embedding. Keys are full normalized inner URIs;
/// bytes are cloned on read and write. Implements the versioned primitives,
/// so atomic references on this backend exercise the generic CAS loop.
pub struct MemoryBackend {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    slots: HashMap<String, Slot>,
    next_version: u64,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").slots.len()
    }

    /// Returns `true` if the backend holds no keys.
    pub fn is_empty(&self) -> bool {
        self.state.read().expect("lock poisoned").slots.is_empty()
    }

    /// Remove all keys.
    pub fn clear(&self) {
        self.state.write().expect("lock poisoned").slots.clear();
    }

    /// Return a sorted list of all stored keys.
    pub fn keys(&self) -> Vec<String> {
        let state = self.state.read().expect("lock poisoned");
        let mut keys: Vec<String> = state.slots.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn scheme(&self) -> &str {
        "mem"
    }

    fn read(&self, uri: &InnerUri, _opts: &OpOptions) -> StoreResult<Option<Vec<u8>>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.slots.get(uri.as_str()).map(|slot| slot.bytes.clone()))
    }

    fn write(&self, uri: &InnerUri, bytes: &[u8], _opts: &OpOptions) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        state.next_version += 1;
        let version = state.next_version;
        state.slots.insert(
            uri.as_str().to_string(),
            Slot {
                bytes: bytes.to_vec(),
                version,
            },
        );
        Ok(())
    }

    fn delete(&self, uri: &InnerUri, _opts: &OpOptions) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        state.slots.remove(uri.as_str());
        Ok(())
    }

    fn supports_versioning(&self) -> bool {
        true
    }

    fn read_versioned(&self, uri: &InnerUri, _opts: &OpOptions) -> StoreResult<Option<Versioned>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.slots.get(uri.as_str()).map(|slot| Versioned {
            bytes: slot.bytes.clone(),
            version: slot.version,
        }))
    }

    fn write_versioned(
        &self,
        uri: &InnerUri,
        bytes: &[u8],
        expected: Option<u64>,
        _opts: &OpOptions,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().expect("lock poisoned");
        let matches = match (expected, state.slots.get(uri.as_str())) {
            (None, None) => true,
            (Some(v), Some(slot)) => slot.version == v,
            _ => false,
        };
        if !matches {
            return Ok(false);
        }
        state.next_version += 1;
        let version = state.next_version;
        state.slots.insert(
            uri.as_str().to_string(),
            Slot {
                bytes: bytes.to_vec(),
                version,
            },
        );
        Ok(true)
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("key_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duraref_types::RefUri;

    fn uri(s: &str) -> InnerUri {
        RefUri::parse(s).unwrap().inner().clone()
    }

    fn opts() -> OpOptions {
        OpOptions::default()
    }

    // -----------------------------------------------------------------------
    // Core read/write/delete
    // -----------------------------------------------------------------------

    #[test]
    fn write_and_read() {
        let backend = MemoryBackend::new();
        let key = uri("mem://b/doc.json");
        backend.write(&key, b"payload", &opts()).unwrap();
        assert_eq!(
            backend.read(&key, &opts()).unwrap(),
            Some(b"payload".to_vec())
        );
    }

    #[test]
    fn read_missing_is_absent() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.read(&uri("mem://b/missing.json"), &opts()).unwrap(), None);
    }

    #[test]
    fn overwrite_replaces() {
        let backend = MemoryBackend::new();
        let key = uri("mem://b/doc.json");
        backend.write(&key, b"a", &opts()).unwrap();
        backend.write(&key, b"b", &opts()).unwrap();
        assert_eq!(backend.read(&key, &opts()).unwrap(), Some(b"b".to_vec()));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn delete_is_idempotent() {
        let backend = MemoryBackend::new();
        let key = uri("mem://b/doc.json");
        backend.write(&key, b"x", &opts()).unwrap();
        backend.delete(&key, &opts()).unwrap();
        backend.delete(&key, &opts()).unwrap();
        assert_eq!(backend.read(&key, &opts()).unwrap(), None);
    }

    // -----------------------------------------------------------------------
    // Versioned primitives
    // -----------------------------------------------------------------------

    #[test]
    fn versions_increase_on_write() {
        let backend = MemoryBackend::new();
        let key = uri("mem://b/doc.json");
        backend.write(&key, b"a", &opts()).unwrap();
        let v1 = backend.read_versioned(&key, &opts()).unwrap().unwrap();
        backend.write(&key, b"b", &opts()).unwrap();
        let v2 = backend.read_versioned(&key, &opts()).unwrap().unwrap();
        assert!(v2.version > v1.version);
    }

    #[test]
    fn conditional_create_if_absent() {
        let backend = MemoryBackend::new();
        let key = uri("mem://b/doc.json");
        assert!(backend.write_versioned(&key, b"a", None, &opts()).unwrap());
        // Second create-if-absent must fail: the key now exists.
        assert!(!backend.write_versioned(&key, b"b", None, &opts()).unwrap());
        assert_eq!(backend.read(&key, &opts()).unwrap(), Some(b"a".to_vec()));
    }

    #[test]
    fn conditional_write_on_version() {
        let backend = MemoryBackend::new();
        let key = uri("mem://b/doc.json");
        backend.write(&key, b"a", &opts()).unwrap();
        let seen = backend.read_versioned(&key, &opts()).unwrap().unwrap();

        assert!(backend
            .write_versioned(&key, b"b", Some(seen.version), &opts())
            .unwrap());
        // Stale version no longer matches.
        assert!(!backend
            .write_versioned(&key, b"c", Some(seen.version), &opts())
            .unwrap());
        assert_eq!(backend.read(&key, &opts()).unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn delete_recreate_never_reissues_a_version() {
        let backend = MemoryBackend::new();
        let key = uri("mem://b/doc.json");
        backend.write(&key, b"a", &opts()).unwrap();
        let seen = backend.read_versioned(&key, &opts()).unwrap().unwrap();

        backend.delete(&key, &opts()).unwrap();
        backend.write(&key, b"b", &opts()).unwrap();
        // A writer still holding the pre-delete version must lose.
        assert!(!backend
            .write_versioned(&key, b"c", Some(seen.version), &opts())
            .unwrap());
    }

    #[test]
    fn native_swap_is_unsupported() {
        let backend = MemoryBackend::new();
        assert!(!backend.supports_atomic_swap());
        assert!(backend.supports_versioning());
    }

    // -----------------------------------------------------------------------
    // Utility surface
    // -----------------------------------------------------------------------

    #[test]
    fn len_clear_keys() {
        let backend = MemoryBackend::new();
        assert!(backend.is_empty());
        backend.write(&uri("mem://b/b.json"), b"1", &opts()).unwrap();
        backend.write(&uri("mem://b/a.json"), b"2", &opts()).unwrap();
        assert_eq!(backend.len(), 2);
        assert_eq!(backend.keys(), vec!["mem://b/a.json", "mem://b/b.json"]);
        backend.clear();
        assert!(backend.is_empty());
    }

    // -----------------------------------------------------------------------
    // Concurrent access
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_conditional_writes_admit_one_winner() {
        use std::sync::Arc;
        use std::thread;

        let backend = Arc::new(MemoryBackend::new());
        let key = uri("mem://b/race.json");
        backend.write(&key, b"base", &opts()).unwrap();
        let seen = backend.read_versioned(&key, &opts()).unwrap().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let backend = Arc::clone(&backend);
                let key = key.clone();
                let version = seen.version;
                thread::spawn(move || {
                    backend
                        .write_versioned(&key, format!("w{i}").as_bytes(), Some(version), &opts())
                        .unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
