//! Run command implementation
//!
//! This module implements the `run` command (synchronization followed by
//! transformation) and the pipeline execution shared with the `sync` and
//! `transform` commands.

use crate::config::{load_config, StrataConfig};
use crate::core::pipeline::{Pipeline, RunMode};
use crate::domain::StrataError;
use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Override the staging tables to synchronize (comma-separated)
    #[arg(long)]
    pub tables: Option<String>,

    /// Cap the number of records transformed per entity this run
    #[arg(long)]
    pub max_records: Option<u64>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        apply_overrides(&mut config, self.tables.as_deref(), self.max_records);

        // Re-validate after CLI overrides
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        // Confirmation prompt (unless --yes)
        if !self.yes {
            println!("Run Configuration:");
            println!("  Source schema: {}", config.source.schema);
            println!(
                "  Target schemas: {} / {}",
                config.target.staging_schema, config.target.domain_schema
            );
            println!(
                "  Tables: {}",
                if config.sync.tables.is_empty() {
                    "all".to_string()
                } else {
                    config.sync.tables.join(", ")
                }
            );
            println!("  Sync chunk size: {}", config.sync.chunk_size);
            println!("  Transform batch size: {}", config.transform.batch_size);
            println!();
            print!("Proceed with run? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Run cancelled.");
                return Ok(0);
            }
        }

        execute_pipeline(config, RunMode::Full).await
    }
}

/// Applies CLI overrides shared by the run, sync, and transform commands
pub(crate) fn apply_overrides(
    config: &mut StrataConfig,
    tables: Option<&str>,
    max_records: Option<u64>,
) {
    if let Some(tables) = tables {
        let names: Vec<String> = tables.split(',').map(|s| s.trim().to_string()).collect();
        tracing::info!(tables = ?names, "Overriding sync tables from CLI");
        config.sync.tables = names;
    }
    if let Some(cap) = max_records {
        tracing::info!(cap, "Overriding transform record cap from CLI");
        config.transform.max_records = Some(cap);
    }
}

/// Builds the pipeline, executes one invocation, and reports the outcome
pub(crate) async fn execute_pipeline(config: StrataConfig, mode: RunMode) -> anyhow::Result<i32> {
    let pipeline = match Pipeline::new(config).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize pipeline");
            eprintln!("Failed to initialize: {e}");
            return Ok(match e {
                StrataError::Connection(_) => 4, // Connection error exit code
                StrataError::Configuration(_) => 2,
                _ => 5, // Fatal error exit code
            });
        }
    };

    let summary = pipeline.run(mode).await;

    println!();
    println!("{}", summary.render_table());

    if !summary.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            println!(
                "  - [{}] {}: {}",
                error.stage.as_str(),
                error.component,
                error.message
            );
        }
        println!();
    }

    let exit_code = if summary.is_success() {
        println!(
            "✅ Run completed successfully ({:.2}s)",
            summary.duration.as_secs_f64()
        );
        0
    } else {
        println!(
            "⚠️  Run completed with errors ({:.2}s)",
            summary.duration.as_secs_f64()
        );
        1 // Partial success
    };

    Ok(exit_code)
}
