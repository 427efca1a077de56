//! Status command implementation
//!
//! This module implements the `status` command for displaying per-table
//! staging row counts, including the pending backlog the next transform
//! run will pick up.

use crate::adapters::store::create_target_store;
use crate::config::load_config;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show a single staging table
    #[arg(long)]
    pub table: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking staging status");

        println!("📊 Staging Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {}", e);
                return Ok(2); // Configuration error exit code
            }
        };

        let target = match create_target_store(&config).await {
            Ok(t) => t,
            Err(e) => {
                println!("❌ Failed to connect to target database");
                println!("   Error: {}", e);
                return Ok(4); // Connection error exit code
            }
        };

        // Idempotent, so a status check against a fresh database shows
        // zero counts instead of failing on missing tables.
        if let Err(e) = target.ensure_schema().await {
            println!("❌ Failed to prepare staging schema");
            println!("   Error: {}", e);
            return Ok(5); // Fatal error exit code
        }

        let statuses = match target.staging_status().await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to read staging status");
                println!("   Error: {}", e);
                return Ok(5);
            }
        };

        let filtered: Vec<_> = statuses
            .iter()
            .filter(|s| {
                self.table
                    .as_deref()
                    .map(|name| s.table.as_str() == name)
                    .unwrap_or(true)
            })
            .collect();

        if filtered.is_empty() {
            println!("No staging tables match the specified filter.");
            return Ok(0);
        }

        println!(
            "{:<28} {:>12} {:>12} {:>12}",
            "Table", "Total", "Pending", "Deleted"
        );
        println!("{}", "-".repeat(68));

        let mut total_pending = 0u64;
        for status in &filtered {
            println!(
                "{:<28} {:>12} {:>12} {:>12}",
                status.table.as_str(),
                status.total_rows,
                status.pending_rows,
                status.deleted_rows
            );
            total_pending += status.pending_rows;
        }

        println!();
        if total_pending == 0 {
            println!("✅ No pending rows. Staging is fully transformed.");
        } else {
            println!(
                "🔄 {} pending row(s). Run 'strata transform' to process them.",
                total_pending
            );
        }
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_defaults() {
        let args = StatusArgs { table: None };
        assert!(args.table.is_none());
    }

    #[test]
    fn test_status_args_with_filter() {
        let args = StatusArgs {
            table: Some("opportunity".to_string()),
        };
        assert_eq!(args.table, Some("opportunity".to_string()));
    }
}
