//! Sync command implementation
//!
//! This module implements the `sync` command, which mirrors the legacy
//! source tables into staging without running the transformation stage.

use super::run::{apply_overrides, execute_pipeline};
use crate::config::load_config;
use crate::core::pipeline::RunMode;
use clap::Args;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Override the staging tables to synchronize (comma-separated)
    #[arg(long)]
    pub tables: Option<String>,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting sync command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        apply_overrides(&mut config, self.tables.as_deref(), None);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        execute_pipeline(config, RunMode::SyncOnly).await
    }
}
