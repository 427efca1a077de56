//! In-memory blob store

use crate::adapters::blob::traits::BlobStore;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One stored blob, kept for test inspection
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Blob store backed by a map, for tests and rehearsal runs
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<BTreeMap<String, StoredBlob>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the blob stored at `path`, if any
    pub async fn get(&self, path: &str) -> Option<StoredBlob> {
        self.blobs.lock().await.get(path).cloned()
    }

    /// Returns every stored path in sorted order
    pub async fn paths(&self) -> Vec<String> {
        self.blobs.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.blobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.lock().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn write(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        self.blobs.lock().await.insert(
            path.to_string(),
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.blobs.lock().await.remove(path);
        Ok(())
    }
}
