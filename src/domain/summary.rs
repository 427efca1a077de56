//! Opportunity summary domain record

use crate::domain::errors::TransformError;
use crate::domain::ids::{OpportunityId, SummaryId};
use crate::staging::key::Lineage;
use crate::staging::normalize::{
    normalize_legacy_timestamp_to_utc, normalize_numeric_string, normalize_yn_bool,
};
use crate::staging::records::LegacySummary;
use chrono::{DateTime, Utc};

/// A normalized opportunity summary
///
/// One record per summary line: the current line has `revision_number`
/// `None`, historical revisions carry theirs. The free-text numeric legacy
/// columns arrive here as real integers (or `None` where the source held
/// placeholder prose), and all dates are UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct OpportunitySummary {
    pub summary_id: SummaryId,
    pub opportunity_id: OpportunityId,
    pub legacy_summary_id: i64,
    pub revision_number: Option<i32>,
    pub post_date: Option<DateTime<Utc>>,
    pub close_date: Option<DateTime<Utc>>,
    pub archive_date: Option<DateTime<Utc>>,
    pub expected_number_of_awards: Option<i64>,
    pub estimated_total_funding: Option<i64>,
    pub award_ceiling: Option<i64>,
    pub award_floor: Option<i64>,
    pub is_cost_sharing: Option<bool>,
    pub summary_description: Option<String>,
    pub agency_contact_description: Option<String>,
    pub agency_email_address: Option<String>,
    pub agency_email_description: Option<String>,
    pub agency_phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OpportunitySummary {
    /// Whether this record is the current summary line
    pub fn is_current(&self) -> bool {
        self.revision_number.is_none()
    }

    /// Builds a fresh record from a legacy row
    pub fn from_legacy(
        record: &LegacySummary,
        opportunity_id: OpportunityId,
        lineage: Lineage,
        existing: Option<&OpportunitySummary>,
        now: DateTime<Utc>,
    ) -> Result<Self, TransformError> {
        Ok(Self {
            summary_id: existing
                .map(|e| e.summary_id)
                .unwrap_or_else(SummaryId::generate),
            opportunity_id,
            legacy_summary_id: record.summary_id,
            revision_number: lineage.revision_number(),
            post_date: normalize_legacy_timestamp_to_utc(record.posting_date),
            close_date: normalize_legacy_timestamp_to_utc(record.response_date),
            archive_date: normalize_legacy_timestamp_to_utc(record.archive_date),
            expected_number_of_awards: normalize_numeric_string(
                record.number_of_awards.as_deref(),
            ),
            estimated_total_funding: normalize_numeric_string(record.est_funding.as_deref()),
            award_ceiling: normalize_numeric_string(record.award_ceiling.as_deref()),
            award_floor: normalize_numeric_string(record.award_floor.as_deref()),
            is_cost_sharing: normalize_yn_bool(record.cost_sharing.as_deref())?,
            summary_description: record.summary_desc.clone(),
            agency_contact_description: record.agency_contact_desc.clone(),
            agency_email_address: record.agency_email.clone(),
            agency_email_description: record.agency_email_desc.clone(),
            agency_phone_number: record.agency_phone.clone(),
            created_at: existing.map(|e| e.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}
