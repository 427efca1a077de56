//! Store integrations for Strata.
//!
//! This module provides the adapters the pipeline runs against:
//!
//! - [`store`] - Store abstraction layer (trait-based) plus the factory
//! - [`postgresql`] - PostgreSQL source and target implementations
//! - [`memory`] - In-memory implementations for tests and rehearsal runs
//! - [`blob`] - Document storage for transformed attachments
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies
//! and enable testing without a database. The store layer uses trait-based
//! abstraction so the sync and transformation engines run identically
//! against PostgreSQL and the in-memory backends.
//!
//! # Rehearsal runs
//!
//! With `backend = "memory"` the factory wires the same engines to the
//! seedable in-memory stores:
//!
//! ```rust,no_run
//! use strata::adapters::memory::{MemorySource, MemoryTarget};
//! use strata::adapters::store::SourceRow;
//! use strata::staging::key::LegacyKey;
//! use strata::staging::records::LegacyOpportunity;
//! use strata::staging::tables::StagingTable;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = MemorySource::new();
//! let record = LegacyOpportunity {
//!     opportunity_id: 7,
//!     opp_number: Some("USDA-RD-2025-001".to_string()),
//!     ..Default::default()
//! };
//! source
//!     .seed_record(StagingTable::Opportunity, LegacyKey::current(7), None, &record)
//!     .await?;
//!
//! let target = MemoryTarget::new();
//! // Hand both to the pipeline in place of the PostgreSQL stores
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod memory;
pub mod postgresql;
pub mod store;
