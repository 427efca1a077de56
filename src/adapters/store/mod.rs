//! Store abstractions
//!
//! Defines the [`SourceStore`] and [`TargetStore`] traits the sync and
//! transformation engines run against, plus the factory that picks a
//! backend from configuration. Production runs use the PostgreSQL
//! adapters; tests and rehearsal runs use the in-memory ones.

pub mod factory;
pub mod traits;

pub use factory::{create_blob_store, create_source_store, create_stores, create_target_store};
pub use traits::{
    DomainWrite, FetchOrder, KeyStamp, PendingInstruction, PendingLink, PendingOpportunity,
    PendingSummary, SourceRow, SourceStore, StagingKeyStamp, StagingMark, TableStatus,
    TargetStore, TransformBatch,
};

use chrono::NaiveDateTime;
use std::cmp::Ordering;

/// Sorts pending rows by their staging stamp and truncates to the batch size
///
/// Rows without a stamp sort last under either order, matching the
/// `NULLS LAST` ordering the PostgreSQL adapter uses. The sort is stable,
/// so equal stamps keep their input order.
pub(crate) fn order_and_truncate<T>(
    mut items: Vec<T>,
    order: FetchOrder,
    limit: usize,
    stamp: impl Fn(&T) -> Option<NaiveDateTime>,
) -> Vec<T> {
    items.sort_by(|a, b| match (stamp(a), stamp(b)) {
        (Some(a), Some(b)) => match order {
            FetchOrder::NewestFirst => b.cmp(&a),
            FetchOrder::OldestFirst => a.cmp(&b),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    items.truncate(limit);
    items
}
