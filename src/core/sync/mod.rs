//! Staging synchronization
//!
//! This module keeps the staging mirror in step with the legacy source:
//! - Key-level diff planning between the two narrow listings
//! - Chunked application of inserts, updates, and soft deletes
//! - Per-table exclusion of columns that must never replicate

pub mod engine;
pub mod plan;

pub use engine::SyncEngine;
pub use plan::TablePlan;
