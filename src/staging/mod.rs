//! Staging mirror layer.
//!
//! The staging store holds one local mirror table per legacy source table:
//! the full mirrored columns as a JSON payload, the source primary key
//! (plus revision number on historical tables), the source last-modified
//! stamp, and the bookkeeping columns the two engines maintain
//! (`is_deleted`, `deleted_at`, `transformed_at`, `transformation_notes`).
//!
//! # Modules
//!
//! - [`tables`] - Canonical table identities for the ten mirrored tables
//! - [`key`] - Legacy primary keys and the current/historical lineage type
//! - [`row`] - The staged row surface and its transformation state
//! - [`records`] - Typed shapes the staged payloads decode into
//! - [`normalize`] - Pure normalizers for legacy value representations
//!
//! # Lifecycle
//!
//! Staging rows are created and updated only by the synchronization engine;
//! `transformed_at`/`transformation_notes` are written only by the
//! transformation engine. Rows are never physically deleted: a vanished
//! source row becomes a soft delete marker, which keeps re-runs replayable.

pub mod key;
pub mod normalize;
pub mod records;
pub mod row;
pub mod tables;

// Re-export commonly used types for convenience
pub use key::{LegacyKey, Lineage};
pub use records::{LegacyInstruction, LegacyLink, LegacyOpportunity, LegacySummary};
pub use row::{SkipReason, StagedRow, TransformState};
pub use tables::StagingTable;
