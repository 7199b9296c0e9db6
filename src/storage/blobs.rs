//! BlobStore trait — opaque image storage for photographic evidence
//!
//! The engine hands over an image payload and gets back a stable URL string;
//! everything else about blob storage is the backend's business.

use std::collections::HashMap;
use std::sync::RwLock;

/// Blob storage errors
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("empty image payload")]
    EmptyPayload,
    #[error("blob store error: {0}")]
    Store(String),
}

/// Trait for pluggable blob backends
pub trait BlobStore: Send + Sync {
    /// Store a payload under the given name, returning a stable URL.
    fn store(&self, bytes: &[u8], name: &str) -> Result<String, BlobError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// In-memory blob store for testing and minimal deployments
///
/// Returned URLs use the `memory://` scheme. Not durable.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored payload back by its URL (test helper).
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        let key = url.strip_prefix("memory://")?;
        self.blobs.read().ok()?.get(key).cloned()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn store(&self, bytes: &[u8], name: &str) -> Result<String, BlobError> {
        if bytes.is_empty() {
            return Err(BlobError::EmptyPayload);
        }
        let mut blobs = self.blobs.write().map_err(|e| BlobError::Store(e.to_string()))?;
        blobs.insert(name.to_string(), bytes.to_vec());
        Ok(format!("memory://{name}"))
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}
