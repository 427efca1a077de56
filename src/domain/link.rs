//! Summary link domain record

use crate::domain::enums::LinkValue;
use crate::domain::ids::{LinkId, SummaryId};
use chrono::{DateTime, Utc};

/// One applicant-type, funding-category, or funding-instrument link on a
/// summary
///
/// Keyed for replay by `(summary_id, legacy_link_id)`; the business
/// invariant is at most one active link per `(summary_id, value)`, which
/// stores enforce on upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryLink {
    pub link_id: LinkId,
    pub summary_id: SummaryId,
    pub legacy_link_id: i64,
    pub value: LinkValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SummaryLink {
    /// Builds a fresh link, carrying identity over from an existing
    /// counterpart on update
    pub fn build(
        summary_id: SummaryId,
        legacy_link_id: i64,
        value: LinkValue,
        existing: Option<&SummaryLink>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            link_id: existing.map(|e| e.link_id).unwrap_or_else(LinkId::generate),
            summary_id,
            legacy_link_id,
            value,
            created_at: existing.map(|e| e.created_at).unwrap_or(now),
            updated_at: now,
        }
    }
}
