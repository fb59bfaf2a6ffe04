//! In-memory blob store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::BlobStore;
use crate::error::{Error, Result};

/// A blob store that keeps objects in memory.
///
/// Useful for tests and for one-off runs where artifacts need not outlive
/// the process.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    bucket: String,
    objects: Mutex<HashMap<String, StoredObject>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_bucket("memory")
    }

    /// Create an empty store reporting the given bucket name.
    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Sorted list of stored keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().map(|o| o.keys().cloned().collect()).unwrap_or_default();
        keys.sort();
        keys
    }

    /// Content type an object was stored with.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.lock()
            .ok()
            .and_then(|o| o.get(key).map(|obj| obj.content_type.clone()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StoredObject>>> {
        self.objects
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))
    }
}

impl BlobStore for MemoryBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.lock()?
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        self.lock()?.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
