//! Core pipeline logic
//!
//! This module contains the two processing stages and their orchestration.
//!
//! # Modules
//!
//! - [`sync`] - Mirrors legacy source tables into staging (diff, fetch, upsert, soft-delete)
//! - [`transform`] - Turns pending staged rows into typed domain records
//! - [`pipeline`] - Wires stores to both stages and collects the run summary
//! - [`metrics`] - Per-entity counters accumulated across a run
//!
//! # Run Workflow
//!
//! One full invocation:
//!
//! 1. **Sync**: For each staging table, diff narrow key listings against the
//!    source, fetch changed rows in chunks, upsert them, and soft-delete
//!    vanished ones.
//! 2. **Transform**: For each entity, drain pending staged rows in batches
//!    into domain records; failed records stay pending for the next run.
//! 3. **Report**: Log per-entity counters and collected component errors.
//!
//! # Example
//!
//! ```rust,no_run
//! use strata::config::load_config;
//! use strata::core::pipeline::{Pipeline, RunMode};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("strata.toml")?;
//! let pipeline = Pipeline::new(config).await?;
//!
//! let summary = pipeline.run(RunMode::Full).await;
//! println!("{}", summary.render_table());
//! # Ok(())
//! # }
//! ```

pub mod metrics;
pub mod pipeline;
pub mod sync;
pub mod transform;
