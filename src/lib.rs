// Strata - Legacy Grants ETL Tool

//! # Strata - Legacy Grants ETL
//!
//! Strata is an ETL tool built in Rust that synchronizes a legacy grants
//! database into a local staging mirror and transforms the staged rows into
//! normalized, strongly-typed domain records.
//!
//! ## Overview
//!
//! A run has two stages:
//!
//! - **Sync** mirrors the legacy source tables into staging using narrow
//!   key/stamp listings, so unchanged rows are never re-fetched. Rows that
//!   vanish from the source are soft-deleted in staging, never dropped.
//! - **Transform** drains pending staging rows into domain records in
//!   batches. Each batch commits domain writes and staging bookkeeping in
//!   one transaction, and a record that fails stays pending so the next run
//!   retries exactly that record.
//!
//! ## Architecture
//!
//! Strata follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (sync, transform, pipeline, metrics)
//! - [`adapters`] - Store backends (PostgreSQL, in-memory) and blob storage
//! - [`staging`] - Staging table identities and row bookkeeping
//! - [`domain`] - Domain types, legacy record shapes, and code mappings
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strata::config::load_config;
//! use strata::core::pipeline::{Pipeline, RunMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let config = load_config("strata.toml")?;
//!
//!     // Build the pipeline (connects stores, ensures schemas)
//!     let pipeline = Pipeline::new(config).await?;
//!
//!     // Execute sync + transform
//!     let summary = pipeline.run(RunMode::Full).await;
//!
//!     println!("{}", summary.render_table());
//!     Ok(())
//! }
//! ```
//!
//! ## Idempotent Re-runs
//!
//! Every operation is safe to repeat. Sync only touches rows whose source
//! stamp changed, transformation marks each staged row with `transformed_at`
//! once applied, and a re-run over already-transformed data produces zero
//! writes. Killing a run between batches loses nothing; the next run picks
//! up the remaining pending rows.
//!
//! ## Error Handling
//!
//! Operational failures use the [`domain::StrataError`] type; per-record
//! data failures use [`domain::TransformError`] and never abort a run:
//!
//! ```rust,no_run
//! use strata::domain::{Result, StrataError};
//!
//! fn check_level(level: &str) -> Result<()> {
//!     if level.is_empty() {
//!         return Err(StrataError::Configuration("log level is empty".into()));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Strata uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(table = "opportunity", rows = 42, "Staging sync complete");
//! warn!(entity = "summary", "No pending records found");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod staging;
