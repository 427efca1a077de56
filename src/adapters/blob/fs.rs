//! Filesystem blob store

use crate::adapters::blob::traits::BlobStore;
use crate::domain::{Result, StrataError};
use async_trait::async_trait;
use std::path::PathBuf;

/// Blob store backed by a local directory tree
///
/// Relative storage keys map straight onto paths under the configured
/// root. Parent directories are created on demand.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn write(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StrataError::Blob(format!(
                    "failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| StrataError::Blob(format!("failed to write {}: {e}", full.display())))?;
        tracing::debug!(path = %full.display(), size = bytes.len(), "Wrote blob");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                tracing::debug!(path = %full.display(), "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StrataError::Blob(format!(
                "failed to delete {}: {e}",
                full.display()
            ))),
        }
    }
}
