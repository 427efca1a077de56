//! Opportunity domain record

use crate::domain::enums::OpportunityCategory;
use crate::domain::errors::TransformError;
use crate::domain::ids::OpportunityId;
use crate::staging::normalize::normalize_yn_bool;
use crate::staging::records::LegacyOpportunity;
use chrono::{DateTime, Utc};

/// A normalized funding opportunity
///
/// Produced by the opportunity transformer from one staged legacy row.
/// `legacy_opportunity_id` is the bridge back to the staging world; repeated
/// transformation runs find the same record through it instead of
/// duplicating.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub opportunity_id: OpportunityId,
    pub legacy_opportunity_id: i64,
    pub opportunity_number: Option<String>,
    pub opportunity_title: Option<String>,
    pub agency_code: Option<String>,
    pub category: Option<OpportunityCategory>,
    pub category_explanation: Option<String>,
    pub is_draft: bool,
    pub revision_number: Option<i32>,
    pub modified_comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    /// Builds a fresh record from a legacy row
    ///
    /// Always constructs from scratch; when a counterpart already exists its
    /// identity and `created_at` carry over so the upsert updates in place.
    /// A populate error here leaves the committed record untouched because
    /// nothing is mutated until the store applies the batch.
    pub fn from_legacy(
        record: &LegacyOpportunity,
        existing: Option<&Opportunity>,
        now: DateTime<Utc>,
    ) -> Result<Self, TransformError> {
        let category = match non_empty(record.opp_category.as_deref()) {
            Some(code) => Some(OpportunityCategory::from_legacy_code(code)?),
            None => None,
        };
        let is_draft = normalize_yn_bool(record.is_draft.as_deref())?.unwrap_or(false);

        Ok(Self {
            opportunity_id: existing
                .map(|e| e.opportunity_id)
                .unwrap_or_else(OpportunityId::generate),
            legacy_opportunity_id: record.opportunity_id,
            opportunity_number: record.opp_number.clone(),
            opportunity_title: record.opp_title.clone(),
            agency_code: record.owning_agency.clone(),
            category,
            category_explanation: record.category_explanation.clone(),
            is_draft,
            revision_number: record.revision_number,
            modified_comments: record.modified_comments.clone(),
            created_at: existing.map(|e| e.created_at).unwrap_or(now),
            updated_at: now,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
