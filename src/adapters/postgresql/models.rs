//! Row extraction for the PostgreSQL stores
//!
//! Staging and domain rows come off the wire with typed columns; these
//! helpers turn them back into the crate's record types. A column that
//! fails to read or an enum value that fails to parse is a storage error:
//! it means the schema or a stored value has drifted from what this
//! version writes.

use crate::domain::enums::{LinkValue, OpportunityCategory};
use crate::domain::ids::{InstructionId, LinkId, OpportunityId, SummaryId};
use crate::domain::instruction::CompetitionInstruction;
use crate::domain::link::SummaryLink;
use crate::domain::opportunity::Opportunity;
use crate::domain::summary::OpportunitySummary;
use crate::domain::{Result, StrataError};
use crate::staging::key::LegacyKey;
use crate::staging::row::StagedRow;
use crate::staging::tables::StagingTable;
use tokio_postgres::types::FromSql;
use tokio_postgres::Row;
use uuid::Uuid;

pub(crate) fn get<'a, T: FromSql<'a>>(row: &'a Row, column: &str) -> Result<T> {
    row.try_get(column)
        .map_err(|e| StrataError::Storage(format!("Failed to read column {column}: {e}")))
}

/// Build a staged row from the uniform staging column set
pub fn staged_row_from_row(table: StagingTable, row: &Row) -> Result<StagedRow> {
    let legacy_id: i64 = get(row, "legacy_id")?;
    let revision: Option<i32> = get(row, "revision_number")?;
    let key = match revision {
        Some(revision) => LegacyKey::historical(legacy_id, revision),
        None => LegacyKey::current(legacy_id),
    };
    Ok(StagedRow {
        table,
        key,
        payload: get(row, "payload")?,
        last_upd_date: get(row, "last_upd_date")?,
        is_deleted: get(row, "is_deleted")?,
        deleted_at: get(row, "deleted_at")?,
        transformed_at: get(row, "transformed_at")?,
        transformation_notes: get(row, "transformation_notes")?,
    })
}

pub fn opportunity_from_row(row: &Row) -> Result<Opportunity> {
    let category = match get::<Option<String>>(row, "category")? {
        Some(stored) => Some(OpportunityCategory::from_stored(&stored).map_err(|e| {
            StrataError::Storage(format!("Stored opportunity category is invalid: {e}"))
        })?),
        None => None,
    };
    Ok(Opportunity {
        opportunity_id: OpportunityId::from_uuid(get::<Uuid>(row, "opportunity_id")?),
        legacy_opportunity_id: get(row, "legacy_opportunity_id")?,
        opportunity_number: get(row, "opportunity_number")?,
        opportunity_title: get(row, "opportunity_title")?,
        agency_code: get(row, "agency_code")?,
        category,
        category_explanation: get(row, "category_explanation")?,
        is_draft: get(row, "is_draft")?,
        revision_number: get(row, "revision_number")?,
        modified_comments: get(row, "modified_comments")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

pub fn summary_from_row(row: &Row) -> Result<OpportunitySummary> {
    Ok(OpportunitySummary {
        summary_id: SummaryId::from_uuid(get::<Uuid>(row, "summary_id")?),
        opportunity_id: OpportunityId::from_uuid(get::<Uuid>(row, "opportunity_id")?),
        legacy_summary_id: get(row, "legacy_summary_id")?,
        revision_number: get(row, "revision_number")?,
        post_date: get(row, "post_date")?,
        close_date: get(row, "close_date")?,
        archive_date: get(row, "archive_date")?,
        expected_number_of_awards: get(row, "expected_number_of_awards")?,
        estimated_total_funding: get(row, "estimated_total_funding")?,
        award_ceiling: get(row, "award_ceiling")?,
        award_floor: get(row, "award_floor")?,
        is_cost_sharing: get(row, "is_cost_sharing")?,
        summary_description: get(row, "summary_description")?,
        agency_contact_description: get(row, "agency_contact_description")?,
        agency_email_address: get(row, "agency_email_address")?,
        agency_email_description: get(row, "agency_email_description")?,
        agency_phone_number: get(row, "agency_phone_number")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

pub fn link_from_row(row: &Row) -> Result<SummaryLink> {
    let entity: String = get(row, "link_entity")?;
    let stored: String = get(row, "link_value")?;
    let value = LinkValue::from_stored(&entity, &stored)
        .map_err(|e| StrataError::Storage(format!("Stored link value is invalid: {e}")))?;
    Ok(SummaryLink {
        link_id: LinkId::from_uuid(get::<Uuid>(row, "link_id")?),
        summary_id: SummaryId::from_uuid(get::<Uuid>(row, "summary_id")?),
        legacy_link_id: get(row, "legacy_link_id")?,
        value,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

pub fn instruction_from_row(row: &Row) -> Result<CompetitionInstruction> {
    Ok(CompetitionInstruction {
        instruction_id: InstructionId::from_uuid(get::<Uuid>(row, "instruction_id")?),
        legacy_instruction_id: get(row, "legacy_instruction_id")?,
        legacy_competition_id: get(row, "legacy_competition_id")?,
        file_name: get(row, "file_name")?,
        extension: get(row, "extension")?,
        storage_path: get(row, "storage_path")?,
        content_type: get(row, "content_type")?,
        file_size_bytes: get(row, "file_size_bytes")?,
        checksum_sha256: get(row, "checksum_sha256")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}
