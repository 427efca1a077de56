//! Blob storage adapters
//!
//! Transformed instruction attachments are written to document storage
//! under deterministic keys. The filesystem store backs production runs;
//! the in-memory store backs tests and rehearsal runs.

pub mod fs;
pub mod memory;
pub mod traits;

pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, StoredBlob};
pub use traits::BlobStore;
