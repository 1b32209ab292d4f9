//! Read-only references: a bare inner URI with read-only semantics.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use duraref_codec::ResolvedCodec;
use duraref_store::Backend;
use duraref_types::{OpOptions, RefUri};
use serde_json::Value;

use crate::error::RefResult;
use crate::reference::fetch_decoded;

/// A read-only view of whatever lives at an inner URI.
///
/// Reads like a volatile reference (uncached, no hash check); every
/// mutating operation is rejected.
#[derive(Clone)]
pub struct ReadOnlyRef {
    uri: RefUri,
    codec: ResolvedCodec,
    backend: Arc<dyn Backend>,
}

impl ReadOnlyRef {
    pub(crate) fn new(uri: RefUri, codec: ResolvedCodec, backend: Arc<dyn Backend>) -> Self {
        Self { uri, codec, backend }
    }

    /// The reference URI.
    pub fn uri(&self) -> &RefUri {
        &self.uri
    }

    /// Read and decode the current value. `Ok(None)` means Absent.
    pub fn read(&self, opts: &OpOptions) -> RefResult<Option<Arc<Value>>> {
        fetch_decoded(&self.backend, &self.codec, &self.uri, opts)
    }
}

impl PartialEq for ReadOnlyRef {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for ReadOnlyRef {}

impl Hash for ReadOnlyRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.as_str().hash(state);
    }
}

impl fmt::Debug for ReadOnlyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyRef")
            .field("uri", &self.uri.as_str())
            .finish()
    }
}
