//! Validate command implementation
//!
//! This module implements the `validate` command, which checks the
//! configuration file and, for database-backed stores, connectivity to
//! the source and target databases.

use crate::adapters::store::{create_source_store, create_target_store};
use crate::config::schema::{BlobBackend, StoreBackend};
use crate::config::{load_config, redacted_endpoint};
use clap::Args;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Skip connectivity checks
    #[arg(long)]
    pub offline: bool,
}

impl ValidateArgs {
    /// Execute the validate command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        match config.validate() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);

                match config.store.backend {
                    StoreBackend::Postgres => {
                        println!("  Store Backend: postgres");
                        println!(
                            "  Source: {} (schema {})",
                            redacted_endpoint(&config.source.connection_string),
                            config.source.schema
                        );
                        println!(
                            "  Target: {} (schemas {} / {})",
                            redacted_endpoint(&config.target.connection_string),
                            config.target.staging_schema,
                            config.target.domain_schema
                        );
                    }
                    StoreBackend::Memory => {
                        println!("  Store Backend: memory");
                    }
                }

                println!("  Sync chunk size: {}", config.sync.chunk_size);
                println!(
                    "  Tables: {}",
                    if config.sync.tables.is_empty() {
                        "all".to_string()
                    } else {
                        config.sync.tables.join(", ")
                    }
                );
                println!("  Transform batch size: {}", config.transform.batch_size);
                println!("  Fetch order: {}", config.transform.fetch_order);
                match config.blob.backend {
                    BlobBackend::Fs => {
                        println!("  Blob backend: fs (root {})", config.blob.root.display());
                    }
                    BlobBackend::Memory => {
                        println!("  Blob backend: memory");
                    }
                }
                println!();
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        }

        if self.offline || config.store.backend == StoreBackend::Memory {
            return Ok(0);
        }

        // Connectivity checks for database-backed stores
        println!("Connectivity:");
        let mut connection_failed = false;

        match create_source_store(&config).await {
            Ok(source) => match source.check_connection().await {
                Ok(_) => println!("  ✅ Source database reachable"),
                Err(e) => {
                    println!("  ❌ Source database: {e}");
                    connection_failed = true;
                }
            },
            Err(e) => {
                println!("  ❌ Source database: {e}");
                connection_failed = true;
            }
        }

        match create_target_store(&config).await {
            Ok(target) => match target.check_connection().await {
                Ok(_) => println!("  ✅ Target database reachable"),
                Err(e) => {
                    println!("  ❌ Target database: {e}");
                    connection_failed = true;
                }
            },
            Err(e) => {
                println!("  ❌ Target database: {e}");
                connection_failed = true;
            }
        }

        println!();
        if connection_failed {
            Ok(4) // Connection error exit code
        } else {
            Ok(0)
        }
    }
}
