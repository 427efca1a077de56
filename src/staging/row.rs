//! Staged row surface and transformation state
//!
//! A [`StagedRow`] is what the transformation engine sees: the mirrored
//! payload plus the bookkeeping columns the two engines maintain. The
//! "untransformed rows are the retry queue" invariant is made explicit by
//! [`TransformState`]: only `Pending` rows are ever fetched into a batch,
//! so a row left unmarked after an error is retried on the next run and a
//! marked row is never revisited.

use crate::domain::errors::TransformError;
use crate::staging::key::{LegacyKey, Lineage};
use crate::staging::tables::StagingTable;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;

/// Machine-readable tag for a deliberately skipped transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The row is a delete but no domain counterpart exists
    OrphanedDeleteRecord,
    /// The row is historical and its parent was never transformed
    OrphanedHistoricalRecord,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::OrphanedDeleteRecord => "orphaned_delete_record",
            SkipReason::OrphanedHistoricalRecord => "orphaned_historical_record",
        }
    }

    /// Parses a stored notes tag; unknown tags return `None`
    pub fn from_notes(notes: &str) -> Option<Self> {
        match notes {
            "orphaned_delete_record" => Some(SkipReason::OrphanedDeleteRecord),
            "orphaned_historical_record" => Some(SkipReason::OrphanedHistoricalRecord),
            _ => None,
        }
    }
}

/// Transformation state of one staging row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformState {
    /// Needs processing; eligible for the next batch fetch
    Pending,
    /// Transformed into a domain write
    Done,
    /// Deliberately skipped with an explanatory tag
    DoneSkipped(SkipReason),
}

/// One staging row as handed to the transformation engine
#[derive(Debug, Clone, PartialEq)]
pub struct StagedRow {
    pub table: StagingTable,
    pub key: LegacyKey,
    /// Mirrored source columns as a JSON document
    pub payload: serde_json::Value,
    /// Source last-modified stamp, surfaced as a real column for the sync
    /// engine's narrow projections and the batch fetch order
    pub last_upd_date: Option<NaiveDateTime>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub transformed_at: Option<DateTime<Utc>>,
    pub transformation_notes: Option<String>,
}

impl StagedRow {
    /// Lineage implied by the row's key
    pub fn lineage(&self) -> Lineage {
        self.key.lineage()
    }

    /// Current transformation state
    ///
    /// A marked row with an unknown notes tag reports `Done`; the raw tag
    /// stays available in `transformation_notes`.
    pub fn transform_state(&self) -> TransformState {
        match (&self.transformed_at, &self.transformation_notes) {
            (None, _) => TransformState::Pending,
            (Some(_), None) => TransformState::Done,
            (Some(_), Some(notes)) => match SkipReason::from_notes(notes) {
                Some(reason) => TransformState::DoneSkipped(reason),
                None => TransformState::Done,
            },
        }
    }

    /// Reads one integer field straight out of the payload document
    ///
    /// Used by the stores to resolve parent joins without decoding the
    /// full record shape.
    pub fn payload_i64(&self, field: &str) -> Option<i64> {
        self.payload.get(field).and_then(serde_json::Value::as_i64)
    }

    /// Decodes the mirrored payload into its typed record shape
    ///
    /// A shape mismatch is a per-record [`TransformError`], not a batch
    /// failure: the row stays pending and the rest of the batch proceeds.
    pub fn decode<T: DeserializeOwned>(&self, entity: &'static str) -> Result<T, TransformError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            TransformError::MalformedRecord {
                entity,
                detail: e.to_string(),
            }
        })
    }
}
