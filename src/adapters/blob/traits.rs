//! Blob storage trait

use crate::domain::Result;
use async_trait::async_trait;

/// Content-addressed document storage for transformed attachments
///
/// Paths are forward-slash relative keys produced by the instruction
/// transformer. Writes replace existing content at the same path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write one blob, replacing any existing content at the path
    ///
    /// # Arguments
    ///
    /// * `path` - Relative storage key, e.g. `competitions/7/instructions/instructions.pdf`
    /// * `bytes` - The blob content
    /// * `content_type` - MIME type derived from the file extension
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be written
    async fn write(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()>;

    /// Remove one blob
    ///
    /// Removing a path that does not exist is not an error, so delete
    /// retries stay idempotent.
    async fn delete(&self, path: &str) -> Result<()>;
}
