//! Transform command implementation
//!
//! This module implements the `transform` command, which drains pending
//! staging rows into domain records without re-synchronizing the source.

use super::run::{apply_overrides, execute_pipeline};
use crate::config::load_config;
use crate::core::pipeline::RunMode;
use clap::Args;

/// Arguments for the transform command
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Cap the number of records transformed per entity this run
    #[arg(long)]
    pub max_records: Option<u64>,
}

impl TransformArgs {
    /// Execute the transform command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting transform command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        apply_overrides(&mut config, None, self.max_records);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        execute_pipeline(config, RunMode::TransformOnly).await
    }
}
