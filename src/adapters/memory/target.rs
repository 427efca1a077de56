//! In-memory target store

use crate::adapters::store::traits::{
    DomainWrite, FetchOrder, PendingInstruction, PendingLink, PendingOpportunity, PendingSummary,
    SourceRow, StagingKeyStamp, TableStatus, TargetStore, TransformBatch,
};
use crate::adapters::store::order_and_truncate;
use crate::domain::enums::LinkEntity;
use crate::domain::ids::{InstructionId, LinkId, OpportunityId, SummaryId};
use crate::domain::instruction::CompetitionInstruction;
use crate::domain::link::SummaryLink;
use crate::domain::opportunity::Opportunity;
use crate::domain::summary::OpportunitySummary;
use crate::domain::Result;
use crate::staging::key::LegacyKey;
use crate::staging::row::StagedRow;
use crate::staging::tables::StagingTable;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct TargetData {
    staging: BTreeMap<StagingTable, BTreeMap<LegacyKey, StagedRow>>,
    opportunities: BTreeMap<OpportunityId, Opportunity>,
    summaries: BTreeMap<SummaryId, OpportunitySummary>,
    links: BTreeMap<LinkId, SummaryLink>,
    instructions: BTreeMap<InstructionId, CompetitionInstruction>,
    domain_writes: u64,
}

impl TargetData {
    fn pending(&self, table: StagingTable) -> Vec<StagedRow> {
        self.staging
            .get(&table)
            .map(|rows| {
                rows.values()
                    .filter(|row| row.transformed_at.is_none())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn opportunity_by_legacy_id(&self, legacy_id: i64) -> Option<Opportunity> {
        self.opportunities
            .values()
            .find(|o| o.legacy_opportunity_id == legacy_id)
            .cloned()
    }

    fn summary_by_lineage(&self, legacy_id: i64, revision: Option<i32>) -> Option<OpportunitySummary> {
        self.summaries
            .values()
            .find(|s| s.legacy_summary_id == legacy_id && s.revision_number == revision)
            .cloned()
    }
}

/// Target store backed by maps, for tests and rehearsal runs
///
/// Mirrors the PostgreSQL target's contract, including cascading deletes
/// and the clearing of transformation bookkeeping on upsert. A write
/// counter lets idempotence tests assert that a repeated run applies no
/// domain writes.
#[derive(Clone, Default)]
pub struct MemoryTarget {
    data: Arc<Mutex<TargetData>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one staging row directly, bypassing sync
    pub async fn seed_staged_row(&self, row: StagedRow) {
        self.data
            .lock()
            .await
            .staging
            .entry(row.table)
            .or_default()
            .insert(row.key, row);
    }

    /// Seed one domain opportunity, for parent-resolution tests
    pub async fn seed_opportunity(&self, opportunity: Opportunity) {
        self.data
            .lock()
            .await
            .opportunities
            .insert(opportunity.opportunity_id, opportunity);
    }

    /// Seed one domain summary, for parent-resolution tests
    pub async fn seed_summary(&self, summary: OpportunitySummary) {
        self.data.lock().await.summaries.insert(summary.summary_id, summary);
    }

    pub async fn staging_row(&self, table: StagingTable, key: LegacyKey) -> Option<StagedRow> {
        self.data
            .lock()
            .await
            .staging
            .get(&table)
            .and_then(|rows| rows.get(&key))
            .cloned()
    }

    pub async fn staging_rows(&self, table: StagingTable) -> Vec<StagedRow> {
        self.data
            .lock()
            .await
            .staging
            .get(&table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn opportunities(&self) -> Vec<Opportunity> {
        self.data.lock().await.opportunities.values().cloned().collect()
    }

    pub async fn opportunity_by_legacy_id(&self, legacy_id: i64) -> Option<Opportunity> {
        self.data.lock().await.opportunity_by_legacy_id(legacy_id)
    }

    pub async fn summaries(&self) -> Vec<OpportunitySummary> {
        self.data.lock().await.summaries.values().cloned().collect()
    }

    pub async fn summary_by_lineage(
        &self,
        legacy_id: i64,
        revision: Option<i32>,
    ) -> Option<OpportunitySummary> {
        self.data.lock().await.summary_by_lineage(legacy_id, revision)
    }

    pub async fn links(&self) -> Vec<SummaryLink> {
        self.data.lock().await.links.values().cloned().collect()
    }

    pub async fn links_for_summary(&self, summary_id: SummaryId) -> Vec<SummaryLink> {
        self.data
            .lock()
            .await
            .links
            .values()
            .filter(|l| l.summary_id == summary_id)
            .cloned()
            .collect()
    }

    pub async fn instructions(&self) -> Vec<CompetitionInstruction> {
        self.data.lock().await.instructions.values().cloned().collect()
    }

    pub async fn instruction_by_competition(&self, competition_id: i64) -> Option<CompetitionInstruction> {
        self.data
            .lock()
            .await
            .instructions
            .values()
            .find(|i| i.legacy_competition_id == competition_id)
            .cloned()
    }

    /// Total domain writes applied since construction
    pub async fn domain_write_count(&self) -> u64 {
        self.data.lock().await.domain_writes
    }
}

#[async_trait]
impl TargetStore for MemoryTarget {
    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn staging_key_listing(&self, table: StagingTable) -> Result<Vec<StagingKeyStamp>> {
        let data = self.data.lock().await;
        let stamps = data
            .staging
            .get(&table)
            .map(|rows| {
                rows.values()
                    .map(|row| StagingKeyStamp {
                        key: row.key,
                        last_upd_date: row.last_upd_date,
                        is_deleted: row.is_deleted,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(stamps)
    }

    async fn upsert_staging_rows(&self, table: StagingTable, rows: Vec<SourceRow>) -> Result<()> {
        let mut data = self.data.lock().await;
        let staged = data.staging.entry(table).or_default();
        for row in rows {
            staged.insert(
                row.key,
                StagedRow {
                    table,
                    key: row.key,
                    payload: serde_json::Value::Object(row.payload),
                    last_upd_date: row.last_upd_date,
                    is_deleted: false,
                    deleted_at: None,
                    transformed_at: None,
                    transformation_notes: None,
                },
            );
        }
        Ok(())
    }

    async fn mark_staging_deleted(
        &self,
        table: StagingTable,
        keys: &[LegacyKey],
        deleted_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut data = self.data.lock().await;
        if let Some(rows) = data.staging.get_mut(&table) {
            for key in keys {
                if let Some(row) = rows.get_mut(key) {
                    row.is_deleted = true;
                    row.deleted_at = Some(deleted_at);
                    row.transformed_at = None;
                    row.transformation_notes = None;
                }
            }
        }
        Ok(())
    }

    async fn fetch_pending_opportunities(
        &self,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingOpportunity>> {
        let data = self.data.lock().await;
        let pending: Vec<PendingOpportunity> = data
            .pending(StagingTable::Opportunity)
            .into_iter()
            .map(|staged| {
                let existing = data.opportunity_by_legacy_id(staged.key.id);
                PendingOpportunity { staged, existing }
            })
            .collect();
        Ok(order_and_truncate(pending, order, batch_size, |p| {
            p.staged.last_upd_date
        }))
    }

    async fn fetch_pending_summaries(
        &self,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingSummary>> {
        let data = self.data.lock().await;
        let mut pending = Vec::new();
        for table in [StagingTable::Summary, StagingTable::SummaryHist] {
            for staged in data.pending(table) {
                let existing = data.summary_by_lineage(staged.key.id, staged.key.revision);
                let parent = staged.payload_i64("opportunity_id")
                    .and_then(|id| data.opportunity_by_legacy_id(id))
                    .map(|o| o.opportunity_id);
                pending.push(PendingSummary {
                    staged,
                    existing,
                    parent,
                });
            }
        }
        Ok(order_and_truncate(pending, order, batch_size, |p| {
            p.staged.last_upd_date
        }))
    }

    async fn fetch_pending_links(
        &self,
        entity: LinkEntity,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingLink>> {
        let data = self.data.lock().await;
        let mut pending = Vec::new();
        let all_tables = StagingTable::all();
        let tables = all_tables
            .iter()
            .copied()
            .filter(|t| t.link_entity() == Some(entity));
        for table in tables {
            for staged in data.pending(table) {
                let parent = staged.payload_i64("summary_id")
                    .and_then(|id| data.summary_by_lineage(id, staged.key.revision))
                    .map(|s| s.summary_id);
                let existing = parent
                    .map(|p| {
                        data.links
                            .values()
                            .filter(|l| l.summary_id == p && l.value.entity() == entity)
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                pending.push(PendingLink {
                    staged,
                    existing,
                    parent,
                });
            }
        }
        Ok(order_and_truncate(pending, order, batch_size, |p| {
            p.staged.last_upd_date
        }))
    }

    async fn fetch_pending_instructions(
        &self,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingInstruction>> {
        let data = self.data.lock().await;
        let pending: Vec<PendingInstruction> = data
            .pending(StagingTable::Instruction)
            .into_iter()
            .map(|staged| {
                let existing = staged.payload_i64("competition_id").and_then(|id| {
                    data.instructions
                        .values()
                        .find(|i| i.legacy_competition_id == id)
                        .cloned()
                });
                PendingInstruction { staged, existing }
            })
            .collect();
        Ok(order_and_truncate(pending, order, batch_size, |p| {
            p.staged.last_upd_date
        }))
    }

    async fn apply_transform_batch(&self, batch: TransformBatch) -> Result<()> {
        let mut data = self.data.lock().await;
        data.domain_writes += batch.writes.len() as u64;
        for write in batch.writes {
            match write {
                DomainWrite::UpsertOpportunity(o) => {
                    data.opportunities.insert(o.opportunity_id, o);
                }
                DomainWrite::DeleteOpportunity(id) => {
                    data.opportunities.remove(&id);
                    let orphaned: Vec<SummaryId> = data
                        .summaries
                        .values()
                        .filter(|s| s.opportunity_id == id)
                        .map(|s| s.summary_id)
                        .collect();
                    for summary_id in orphaned {
                        data.summaries.remove(&summary_id);
                        data.links.retain(|_, l| l.summary_id != summary_id);
                    }
                }
                DomainWrite::UpsertSummary(s) => {
                    data.summaries.insert(s.summary_id, s);
                }
                DomainWrite::DeleteSummary(id) => {
                    data.summaries.remove(&id);
                    data.links.retain(|_, l| l.summary_id != id);
                }
                DomainWrite::UpsertLink(l) => {
                    data.links.insert(l.link_id, l);
                }
                DomainWrite::DeleteLink(id) => {
                    data.links.remove(&id);
                }
                DomainWrite::UpsertInstruction(i) => {
                    data.instructions.insert(i.instruction_id, i);
                }
                DomainWrite::DeleteInstruction(id) => {
                    data.instructions.remove(&id);
                }
            }
        }
        for mark in batch.marks {
            if let Some(row) = data
                .staging
                .get_mut(&mark.table)
                .and_then(|rows| rows.get_mut(&mark.key))
            {
                row.transformed_at = Some(mark.transformed_at);
                row.transformation_notes = mark.skip.map(|s| s.as_str().to_string());
            }
        }
        Ok(())
    }

    async fn staging_status(&self) -> Result<Vec<TableStatus>> {
        let data = self.data.lock().await;
        let statuses = StagingTable::all()
            .iter()
            .map(|&table| {
                let rows = data.staging.get(&table);
                let total = rows.map(|r| r.len() as u64).unwrap_or(0);
                let pending = rows
                    .map(|r| r.values().filter(|row| row.transformed_at.is_none()).count() as u64)
                    .unwrap_or(0);
                let deleted = rows
                    .map(|r| r.values().filter(|row| row.is_deleted).count() as u64)
                    .unwrap_or(0);
                TableStatus {
                    table,
                    total_rows: total,
                    pending_rows: pending,
                    deleted_rows: deleted,
                }
            })
            .collect();
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn source_row(id: i64, day: u32) -> SourceRow {
        let mut payload = serde_json::Map::new();
        payload.insert("opportunity_id".to_string(), serde_json::json!(id));
        SourceRow {
            key: LegacyKey::current(id),
            last_upd_date: NaiveDate::from_ymd_opt(2025, 3, day)
                .unwrap()
                .and_hms_opt(9, 0, 0),
            payload,
        }
    }

    #[tokio::test]
    async fn test_upsert_clears_bookkeeping() {
        let target = MemoryTarget::new();
        target
            .upsert_staging_rows(StagingTable::Opportunity, vec![source_row(1, 1)])
            .await
            .unwrap();
        target
            .mark_staging_deleted(StagingTable::Opportunity, &[LegacyKey::current(1)], Utc::now())
            .await
            .unwrap();

        // A fresh upsert resurrects the row and re-queues it
        target
            .upsert_staging_rows(StagingTable::Opportunity, vec![source_row(1, 2)])
            .await
            .unwrap();

        let row = target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(1))
            .await
            .unwrap();
        assert!(!row.is_deleted);
        assert!(row.deleted_at.is_none());
        assert!(row.transformed_at.is_none());
    }

    #[tokio::test]
    async fn test_mark_deleted_requeues_for_transform() {
        let target = MemoryTarget::new();
        target
            .upsert_staging_rows(StagingTable::Opportunity, vec![source_row(1, 1)])
            .await
            .unwrap();
        let now = Utc::now();
        target
            .mark_staging_deleted(StagingTable::Opportunity, &[LegacyKey::current(1)], now)
            .await
            .unwrap();

        let row = target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(1))
            .await
            .unwrap();
        assert!(row.is_deleted);
        assert_eq!(row.deleted_at, Some(now));
        assert!(row.transformed_at.is_none());

        let pending = target
            .fetch_pending_opportunities(10, FetchOrder::NewestFirst)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_order_newest_first() {
        let target = MemoryTarget::new();
        target
            .upsert_staging_rows(
                StagingTable::Opportunity,
                vec![source_row(1, 1), source_row(2, 9), source_row(3, 5)],
            )
            .await
            .unwrap();

        let pending = target
            .fetch_pending_opportunities(2, FetchOrder::NewestFirst)
            .await
            .unwrap();
        let ids: Vec<i64> = pending.iter().map(|p| p.staged.key.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_delete_summary_cascades_links() {
        use crate::domain::enums::{ApplicantType, LinkValue};

        let target = MemoryTarget::new();
        let now = Utc::now();
        let opportunity_id = OpportunityId::generate();
        let summary_id = SummaryId::generate();
        let summary = OpportunitySummary {
            summary_id,
            opportunity_id,
            legacy_summary_id: 5,
            revision_number: None,
            post_date: None,
            close_date: None,
            archive_date: None,
            expected_number_of_awards: None,
            estimated_total_funding: None,
            award_ceiling: None,
            award_floor: None,
            is_cost_sharing: None,
            summary_description: None,
            agency_contact_description: None,
            agency_email_address: None,
            agency_email_description: None,
            agency_phone_number: None,
            created_at: now,
            updated_at: now,
        };
        let link = SummaryLink {
            link_id: LinkId::generate(),
            summary_id,
            legacy_link_id: 9,
            value: LinkValue::ApplicantType(ApplicantType::Individuals),
            created_at: now,
            updated_at: now,
        };
        target.seed_summary(summary).await;
        target
            .apply_transform_batch(TransformBatch {
                writes: vec![DomainWrite::UpsertLink(link)],
                marks: vec![],
            })
            .await
            .unwrap();
        assert_eq!(target.links().await.len(), 1);

        target
            .apply_transform_batch(TransformBatch {
                writes: vec![DomainWrite::DeleteSummary(summary_id)],
                marks: vec![],
            })
            .await
            .unwrap();
        assert!(target.summaries().await.is_empty());
        assert!(target.links().await.is_empty());
    }
}
