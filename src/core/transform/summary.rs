//! Opportunity summary transformer
//!
//! Handles both the current summary table and its historical variant. A
//! historical row whose action code maps to deleted is treated exactly
//! like a sync-detected delete; a historical row whose parent opportunity
//! was never transformed is an expected gap, not an error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapters::store::{DomainWrite, PendingSummary, TargetStore, TransformBatch};
use crate::core::metrics::{Counter, RunMetrics};
use crate::core::transform::dispatcher::{
    fold_outcome, record_error, BatchProgress, BatchSettings, EntityTransformer, RecordOutcome,
};
use crate::domain::errors::TransformError;
use crate::domain::summary::OpportunitySummary;
use crate::domain::Result;
use crate::staging::normalize::normalize_action_code_to_is_deleted;
use crate::staging::records::LegacySummary;
use crate::staging::row::SkipReason;

/// Transforms staged summary rows into domain summaries
pub struct SummaryTransformer {
    target: Arc<dyn TargetStore>,
    progress: BatchProgress,
}

impl SummaryTransformer {
    pub fn new(target: Arc<dyn TargetStore>, settings: BatchSettings) -> Self {
        Self {
            target,
            progress: BatchProgress::new(settings),
        }
    }
}

/// Decides what one pending summary row becomes
///
/// Deletes resolve against the domain counterpart only; the parent
/// opportunity is required just for the upsert path, so a delete whose
/// parent cascade already removed the summary lands as an orphan skip
/// instead of a missing-parent error.
fn process_one(
    pending: &PendingSummary,
    now: DateTime<Utc>,
) -> std::result::Result<RecordOutcome, TransformError> {
    let record: LegacySummary = pending.staged.decode("summary")?;

    let action_deleted =
        normalize_action_code_to_is_deleted(record.action_type.as_deref())?.unwrap_or(false);
    if pending.staged.is_deleted || action_deleted {
        return Ok(match &pending.existing {
            Some(existing) => {
                RecordOutcome::Deleted(DomainWrite::DeleteSummary(existing.summary_id))
            }
            None => RecordOutcome::Skipped(SkipReason::OrphanedDeleteRecord),
        });
    }

    let Some(parent) = pending.parent else {
        if pending.staged.table.is_historical() {
            return Ok(RecordOutcome::Skipped(SkipReason::OrphanedHistoricalRecord));
        }
        return Err(TransformError::MissingParent { entity: "summary" });
    };

    let summary = OpportunitySummary::from_legacy(
        &record,
        parent,
        pending.staged.lineage(),
        pending.existing.as_ref(),
        now,
    )?;
    Ok(if pending.existing.is_some() {
        RecordOutcome::Updated(DomainWrite::UpsertSummary(summary))
    } else {
        RecordOutcome::Inserted(DomainWrite::UpsertSummary(summary))
    })
}

#[async_trait]
impl EntityTransformer for SummaryTransformer {
    fn entity(&self) -> &'static str {
        "summary"
    }

    fn has_more_to_process(&self) -> bool {
        self.progress.has_more()
    }

    async fn transform_records(&mut self, metrics: &mut RunMetrics) -> Result<()> {
        let fetch_size = self.progress.next_fetch_size();
        if fetch_size == 0 {
            self.progress.record_fetch(0, 0);
            return Ok(());
        }

        let pending = self
            .target
            .fetch_pending_summaries(fetch_size, self.progress.order())
            .await?;
        self.progress.record_fetch(fetch_size, pending.len());
        if pending.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = pending.len(), "Processing summary batch");

        let now = Utc::now();
        let mut batch = TransformBatch::default();
        for item in &pending {
            metrics.incr(self.entity(), Counter::Processed);
            match process_one(item, now) {
                Ok(outcome) => {
                    fold_outcome(&mut batch, metrics, self.entity(), &item.staged, outcome, now)
                }
                Err(error) => record_error(metrics, self.entity(), &item.staged, &error),
            }
        }

        if !batch.is_empty() {
            self.target.apply_transform_batch(batch).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryTarget;
    use crate::adapters::store::FetchOrder;
    use crate::domain::opportunity::Opportunity;
    use crate::staging::records::LegacyOpportunity;
    use crate::staging::{LegacyKey, StagedRow, StagingTable};

    fn settings() -> BatchSettings {
        BatchSettings::new(100, None, FetchOrder::NewestFirst)
    }

    async fn seed_parent_opportunity(target: &MemoryTarget, legacy_id: i64) -> Opportunity {
        let record = LegacyOpportunity {
            opportunity_id: legacy_id,
            opp_number: Some(format!("HHS-25-{legacy_id:03}")),
            ..Default::default()
        };
        let opportunity = Opportunity::from_legacy(&record, None, Utc::now()).unwrap();
        target.seed_opportunity(opportunity.clone()).await;
        opportunity
    }

    fn legacy_summary(summary_id: i64, opportunity_id: i64) -> LegacySummary {
        LegacySummary {
            summary_id,
            opportunity_id,
            number_of_awards: Some("5".to_string()),
            cost_sharing: Some("N".to_string()),
            summary_desc: Some("Hospital preparedness grants.".to_string()),
            ..Default::default()
        }
    }

    fn staged_current(record: &LegacySummary, is_deleted: bool) -> StagedRow {
        StagedRow {
            table: StagingTable::Summary,
            key: LegacyKey::current(record.summary_id),
            payload: serde_json::to_value(record).unwrap(),
            last_upd_date: None,
            is_deleted,
            deleted_at: is_deleted.then(Utc::now),
            transformed_at: None,
            transformation_notes: None,
        }
    }

    fn staged_historical(record: &LegacySummary, revision: i32) -> StagedRow {
        StagedRow {
            table: StagingTable::SummaryHist,
            key: LegacyKey::historical(record.summary_id, revision),
            payload: serde_json::to_value(record).unwrap(),
            last_upd_date: None,
            is_deleted: false,
            deleted_at: None,
            transformed_at: None,
            transformation_notes: None,
        }
    }

    #[tokio::test]
    async fn test_insert_resolves_parent() {
        let target = MemoryTarget::new();
        let parent = seed_parent_opportunity(&target, 4711).await;
        target
            .seed_staged_row(staged_current(&legacy_summary(9001, 4711), false))
            .await;

        let mut transformer = SummaryTransformer::new(Arc::new(target.clone()), settings());
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();

        let summary = target.summary_by_lineage(9001, None).await.unwrap();
        assert_eq!(summary.opportunity_id, parent.opportunity_id);
        assert_eq!(summary.expected_number_of_awards, Some(5));
        assert_eq!(metrics.get("summary", Counter::Inserted), 1);
    }

    #[tokio::test]
    async fn test_historical_revision_is_its_own_record() {
        let target = MemoryTarget::new();
        seed_parent_opportunity(&target, 4711).await;
        let mut record = legacy_summary(9001, 4711);
        record.revision_number = Some(2);
        record.action_type = Some("U".to_string());
        target.seed_staged_row(staged_historical(&record, 2)).await;

        let mut transformer = SummaryTransformer::new(Arc::new(target.clone()), settings());
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();

        let summary = target.summary_by_lineage(9001, Some(2)).await.unwrap();
        assert_eq!(summary.revision_number, Some(2));
        assert_eq!(metrics.get("summary", Counter::Inserted), 1);
    }

    #[tokio::test]
    async fn test_historical_row_without_parent_is_a_tagged_skip() {
        let target = MemoryTarget::new();
        let mut record = legacy_summary(9001, 4711);
        record.revision_number = Some(1);
        target.seed_staged_row(staged_historical(&record, 1)).await;

        let mut transformer = SummaryTransformer::new(Arc::new(target.clone()), settings());
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();

        let row = target
            .staging_row(StagingTable::SummaryHist, LegacyKey::historical(9001, 1))
            .await
            .unwrap();
        assert_eq!(
            row.transformation_notes.as_deref(),
            Some("orphaned_historical_record")
        );
        assert_eq!(metrics.get("summary", Counter::HistoricalOrphansSkipped), 1);
        assert_eq!(metrics.get("summary", Counter::Errored), 0);
    }

    #[tokio::test]
    async fn test_current_row_without_parent_is_an_error() {
        let target = MemoryTarget::new();
        target
            .seed_staged_row(staged_current(&legacy_summary(9001, 4711), false))
            .await;

        let mut transformer = SummaryTransformer::new(Arc::new(target.clone()), settings());
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();

        assert_eq!(metrics.get("summary", Counter::Errored), 1);
        let row = target
            .staging_row(StagingTable::Summary, LegacyKey::current(9001))
            .await
            .unwrap();
        assert!(row.transformed_at.is_none());
    }

    #[tokio::test]
    async fn test_historical_delete_action_removes_the_revision() {
        let target = MemoryTarget::new();
        seed_parent_opportunity(&target, 4711).await;

        let mut record = legacy_summary(9001, 4711);
        record.revision_number = Some(3);
        record.action_type = Some("U".to_string());
        target.seed_staged_row(staged_historical(&record, 3)).await;
        let mut transformer = SummaryTransformer::new(Arc::new(target.clone()), settings());
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();
        assert!(target.summary_by_lineage(9001, Some(3)).await.is_some());

        // The same revision later arrives with a delete action
        record.action_type = Some("D".to_string());
        target.seed_staged_row(staged_historical(&record, 3)).await;
        let mut transformer = SummaryTransformer::new(Arc::new(target.clone()), settings());
        transformer.transform_records(&mut metrics).await.unwrap();

        assert!(target.summary_by_lineage(9001, Some(3)).await.is_none());
        assert_eq!(metrics.get("summary", Counter::Deleted), 1);
    }

    #[tokio::test]
    async fn test_delete_without_counterpart_is_a_tagged_skip() {
        let target = MemoryTarget::new();
        let mut record = legacy_summary(9001, 4711);
        record.revision_number = Some(3);
        record.action_type = Some("D".to_string());
        target.seed_staged_row(staged_historical(&record, 3)).await;

        let mut transformer = SummaryTransformer::new(Arc::new(target.clone()), settings());
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();

        assert_eq!(metrics.get("summary", Counter::DeleteOrphansSkipped), 1);
        assert_eq!(metrics.get("summary", Counter::Errored), 0);
        let row = target
            .staging_row(StagingTable::SummaryHist, LegacyKey::historical(9001, 3))
            .await
            .unwrap();
        assert_eq!(
            row.transformation_notes.as_deref(),
            Some("orphaned_delete_record")
        );
    }

    #[tokio::test]
    async fn test_unknown_action_code_is_an_error() {
        let target = MemoryTarget::new();
        seed_parent_opportunity(&target, 4711).await;
        let mut record = legacy_summary(9001, 4711);
        record.revision_number = Some(1);
        record.action_type = Some("X".to_string());
        target.seed_staged_row(staged_historical(&record, 1)).await;

        let mut transformer = SummaryTransformer::new(Arc::new(target.clone()), settings());
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();

        assert_eq!(metrics.get("summary", Counter::Errored), 1);
        let row = target
            .staging_row(StagingTable::SummaryHist, LegacyKey::historical(9001, 1))
            .await
            .unwrap();
        assert!(row.transformed_at.is_none());
    }
}
