//! Weak-keyed canonicalization of value references, and the origin
//! back-link from cached values to the reference that produced them.
//!
//! The intern pool guarantees at most one live canonical value reference
//! per URI, so all aliases of a content-addressed blob share one decoded
//! cache. Entries hold weak handles only: the pool never keeps a reference
//! alive, and a dead entry is purged when its canonical reference drops or
//! the slot is next touched.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;

use crate::value::{ValueRef, ValueShared};

/// Process-wide (per-runtime) map from canonical value URI to a weak handle
/// of the canonical reference.
pub(crate) struct InternPool {
    entries: Mutex<HashMap<String, Weak<ValueShared>>>,
}

impl InternPool {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the canonical reference for the candidate's URI.
    ///
    /// When a live canonical exists the candidate is discarded and the
    /// canonical returned; otherwise the candidate becomes canonical.
    pub(crate) fn intern(&self, candidate: ValueRef) -> ValueRef {
        let existing = {
            let mut entries = self.entries.lock().expect("lock poisoned");
            match entries.entry(candidate.uri().as_str().to_string()) {
                Entry::Occupied(mut entry) => match entry.get().upgrade() {
                    Some(existing) => Some(existing),
                    None => {
                        entry.insert(Arc::downgrade(candidate.shared()));
                        None
                    }
                },
                Entry::Vacant(entry) => {
                    entry.insert(Arc::downgrade(candidate.shared()));
                    None
                }
            }
        };
        // The pool lock is released before a losing candidate can drop;
        // its drop hook re-enters the pool to purge.
        match existing {
            Some(shared) => ValueRef::from_shared(shared),
            None => candidate,
        }
    }

    /// The live canonical reference for a URI, if any.
    pub(crate) fn get(&self, uri: &str) -> Option<ValueRef> {
        let upgraded = {
            let entries = self.entries.lock().expect("lock poisoned");
            entries.get(uri).and_then(Weak::upgrade)
        };
        // The canonical Arc leaves the critical section before it can be
        // dropped; a drop inside would re-enter the pool lock.
        upgraded.map(ValueRef::from_shared)
    }

    /// Whether a live canonical reference exists for this URI.
    pub(crate) fn is_interned(&self, uri: &str) -> bool {
        self.get(uri).is_some()
    }

    /// Remove the entry for `uri` if its canonical reference is gone.
    ///
    /// Called from the canonical reference's drop; checking the strong
    /// count instead of upgrading avoids materializing an `Arc` under the
    /// pool lock.
    pub(crate) fn purge(&self, uri: &str) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        if let Some(weak) = entries.get(uri) {
            if weak.strong_count() == 0 {
                entries.remove(uri);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }
}

/// Back-links from cached decoded values to their originating reference.
///
/// Keyed by the address of the cached `Arc<Value>` allocation. An entry is
/// only trusted after verifying that the candidate reference's cache still
/// holds that exact `Arc`, so a recycled allocation address can never alias
/// a live entry.
pub(crate) struct OriginRegistry {
    entries: Mutex<HashMap<usize, Weak<ValueShared>>>,
}

fn key(value: &Arc<Value>) -> usize {
    Arc::as_ptr(value) as usize
}

impl OriginRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn record(&self, value: &Arc<Value>, origin: &Arc<ValueShared>) {
        self.entries
            .lock()
            .expect("lock poisoned")
            .insert(key(value), Arc::downgrade(origin));
    }

    pub(crate) fn remove(&self, value: &Arc<Value>) {
        self.entries.lock().expect("lock poisoned").remove(&key(value));
    }

    /// The candidate origin for a value. The caller must verify the
    /// candidate's cache still holds this exact `Arc`.
    pub(crate) fn lookup(&self, value: &Arc<Value>) -> Option<Arc<ValueShared>> {
        let upgraded = {
            let entries = self.entries.lock().expect("lock poisoned");
            entries.get(&key(value)).and_then(Weak::upgrade)
        };
        upgraded
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }
}
