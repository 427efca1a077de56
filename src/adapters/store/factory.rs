//! Store factory
//!
//! This module provides factory functions to create stores based on configuration.

use crate::adapters::blob::{BlobStore, FsBlobStore, MemoryBlobStore};
use crate::adapters::memory::{MemorySource, MemoryTarget};
use crate::adapters::postgresql::{PostgresSource, PostgresTarget};
use crate::adapters::store::traits::{SourceStore, TargetStore};
use crate::config::schema::{BlobBackend, StoreBackend, StrataConfig};
use crate::domain::Result;
use std::sync::Arc;

/// Create a source store based on the configuration
///
/// # Arguments
///
/// * `config` - The Strata configuration
///
/// # Returns
///
/// Returns an Arc-wrapped trait object that implements SourceStore
///
/// # Errors
///
/// Returns an error if the source store cannot be created
pub async fn create_source_store(config: &StrataConfig) -> Result<Arc<dyn SourceStore>> {
    match config.store.backend {
        StoreBackend::Postgres => {
            tracing::info!("Creating PostgreSQL source store");
            let store = PostgresSource::connect(&config.source).await?;
            Ok(Arc::new(store) as Arc<dyn SourceStore>)
        }
        StoreBackend::Memory => {
            tracing::info!("Creating in-memory source store");
            Ok(Arc::new(MemorySource::new()) as Arc<dyn SourceStore>)
        }
    }
}

/// Create a target store based on the configuration
///
/// # Arguments
///
/// * `config` - The Strata configuration
///
/// # Returns
///
/// Returns an Arc-wrapped trait object that implements TargetStore
///
/// # Errors
///
/// Returns an error if the target store cannot be created
pub async fn create_target_store(config: &StrataConfig) -> Result<Arc<dyn TargetStore>> {
    match config.store.backend {
        StoreBackend::Postgres => {
            tracing::info!("Creating PostgreSQL target store");
            let store = PostgresTarget::connect(&config.target).await?;
            Ok(Arc::new(store) as Arc<dyn TargetStore>)
        }
        StoreBackend::Memory => {
            tracing::info!("Creating in-memory target store");
            Ok(Arc::new(MemoryTarget::new()) as Arc<dyn TargetStore>)
        }
    }
}

/// Create a blob store based on the configuration
///
/// # Arguments
///
/// * `config` - The Strata configuration
///
/// # Returns
///
/// Returns an Arc-wrapped trait object that implements BlobStore
///
/// # Errors
///
/// Returns an error if the blob store cannot be created
pub async fn create_blob_store(config: &StrataConfig) -> Result<Arc<dyn BlobStore>> {
    match config.blob.backend {
        BlobBackend::Fs => {
            tracing::info!(root = %config.blob.root.display(), "Creating filesystem blob store");
            let store = FsBlobStore::new(config.blob.root.clone());
            Ok(Arc::new(store) as Arc<dyn BlobStore>)
        }
        BlobBackend::Memory => {
            tracing::info!("Creating in-memory blob store");
            Ok(Arc::new(MemoryBlobStore::new()) as Arc<dyn BlobStore>)
        }
    }
}

/// Create the source, target, and blob stores from one configuration
///
/// # Arguments
///
/// * `config` - The Strata configuration
///
/// # Returns
///
/// Returns a tuple of (SourceStore, TargetStore, BlobStore) trait objects
///
/// # Errors
///
/// Returns an error if any store cannot be created
pub async fn create_stores(
    config: &StrataConfig,
) -> Result<(
    Arc<dyn SourceStore>,
    Arc<dyn TargetStore>,
    Arc<dyn BlobStore>,
)> {
    let source = create_source_store(config).await?;
    let target = create_target_store(config).await?;
    let blobs = create_blob_store(config).await?;
    Ok((source, target, blobs))
}
