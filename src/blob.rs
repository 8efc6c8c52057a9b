//! Blob storage collaborator boundary.
//!
//! Ingestion stores each raw upload before processing it, so the original
//! bytes survive independently of the index. The interface is a single
//! idempotent `upload`: re-uploading an existing filename returns the stored
//! uri without rewriting.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::RagError;

/// Collaborator boundary for whole-file blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `filename` and returns the blob uri. Idempotent
    /// per filename.
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, RagError>;
}

/// Process-memory blob store for tests, demos, and single-process runs.
pub struct MemoryBlobStore {
    bucket: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    /// Returns a copy of the stored bytes, if any.
    pub fn get(&self, filename: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(filename).cloned()
    }

    fn uri_for(&self, filename: &str) -> String {
        format!("mem://{}/{}", self.bucket, filename)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, RagError> {
        let mut objects = self.objects.lock();
        if objects.contains_key(filename) {
            tracing::debug!(filename, "blob already stored, reusing uri");
            return Ok(self.uri_for(filename));
        }
        objects.insert(filename.to_string(), bytes.to_vec());
        Ok(self.uri_for(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_is_idempotent_and_keeps_first_bytes() {
        let store = MemoryBlobStore::new("bucket");

        let first = store.upload("doc.txt", b"original").await.unwrap();
        let second = store.upload("doc.txt", b"rewritten").await.unwrap();

        assert_eq!(first, "mem://bucket/doc.txt");
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("doc.txt").unwrap(), b"original");
    }
}
