//! Volatile references: mutable, uncached, last-writer-wins.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use duraref_codec::ResolvedCodec;
use duraref_store::Backend;
use duraref_types::{OpOptions, RefUri};
use serde_json::Value;

use crate::error::RefResult;
use crate::reference::{encode_for_write, fetch_decoded};

/// A mutable reference without concurrency coordination.
///
/// Reads go straight to storage with no cache and no hash check; writes
/// are last-writer-wins with no ordering guarantees across holders.
#[derive(Clone)]
pub struct VolatileRef {
    uri: RefUri,
    codec: ResolvedCodec,
    backend: Arc<dyn Backend>,
}

impl VolatileRef {
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

    /// Encode and write a new value, replacing any previous content.
    pub fn overwrite(&self, value: &Value, opts: &OpOptions) -> RefResult<()> {
        let bytes = encode_for_write(&self.codec, value, opts)?;
        self.backend.write(self.uri.inner(), &bytes, opts)?;
        Ok(())
    }

    /// Delete the stored value. Deleting a missing key succeeds.
    pub fn delete(&self, opts: &OpOptions) -> RefResult<()> {
        self.backend.delete(self.uri.inner(), opts)?;
        Ok(())
    }
}

impl PartialEq for VolatileRef {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for VolatileRef {}

impl Hash for VolatileRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.as_str().hash(state);
    }
}

impl fmt::Debug for VolatileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolatileRef")
            .field("uri", &self.uri.as_str())
            .finish()
    }
}
