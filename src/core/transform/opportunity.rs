//! Opportunity transformer

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapters::store::{DomainWrite, PendingOpportunity, TargetStore, TransformBatch};
use crate::core::metrics::{Counter, RunMetrics};
use crate::core::transform::dispatcher::{
    fold_outcome, record_error, BatchProgress, BatchSettings, EntityTransformer, RecordOutcome,
};
use crate::domain::errors::TransformError;
use crate::domain::opportunity::Opportunity;
use crate::domain::Result;
use crate::staging::records::LegacyOpportunity;
use crate::staging::row::SkipReason;

/// Transforms staged opportunity rows into domain opportunities
pub struct OpportunityTransformer {
    target: Arc<dyn TargetStore>,
    progress: BatchProgress,
}

impl OpportunityTransformer {
    pub fn new(target: Arc<dyn TargetStore>, settings: BatchSettings) -> Self {
        Self {
            target,
            progress: BatchProgress::new(settings),
        }
    }
}

/// Decides what one pending opportunity row becomes
///
/// Pure: no store access. Deleting an opportunity cascades to its
/// summaries and their links at the store.
fn process_one(
    pending: &PendingOpportunity,
    now: DateTime<Utc>,
) -> std::result::Result<RecordOutcome, TransformError> {
    if pending.staged.is_deleted {
        return Ok(match &pending.existing {
            Some(existing) => {
                RecordOutcome::Deleted(DomainWrite::DeleteOpportunity(existing.opportunity_id))
            }
            None => RecordOutcome::Skipped(SkipReason::OrphanedDeleteRecord),
        });
    }

    let record: LegacyOpportunity = pending.staged.decode("opportunity")?;
    let opportunity = Opportunity::from_legacy(&record, pending.existing.as_ref(), now)?;
    Ok(if pending.existing.is_some() {
        RecordOutcome::Updated(DomainWrite::UpsertOpportunity(opportunity))
    } else {
        RecordOutcome::Inserted(DomainWrite::UpsertOpportunity(opportunity))
    })
}

#[async_trait]
impl EntityTransformer for OpportunityTransformer {
    fn entity(&self) -> &'static str {
        "opportunity"
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
            .fetch_pending_opportunities(fetch_size, self.progress.order())
            .await?;
        self.progress.record_fetch(fetch_size, pending.len());
        if pending.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = pending.len(), "Processing opportunity batch");

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
    use crate::core::transform::dispatcher::run_to_completion;
    use crate::staging::{LegacyKey, StagedRow, StagingTable};

    fn settings(batch_size: usize) -> BatchSettings {
        BatchSettings::new(batch_size, None, FetchOrder::NewestFirst)
    }

    fn legacy(id: i64) -> LegacyOpportunity {
        LegacyOpportunity {
            opportunity_id: id,
            opp_number: Some(format!("ED-25-{id:03}")),
            opp_title: Some("Adult Literacy Program".to_string()),
            owning_agency: Some("ED".to_string()),
            opp_category: Some("D".to_string()),
            is_draft: Some("N".to_string()),
            ..Default::default()
        }
    }

    fn staged(record: &LegacyOpportunity, is_deleted: bool) -> StagedRow {
        StagedRow {
            table: StagingTable::Opportunity,
            key: LegacyKey::current(record.opportunity_id),
            payload: serde_json::to_value(record).unwrap(),
            last_upd_date: None,
            is_deleted,
            deleted_at: is_deleted.then(Utc::now),
            transformed_at: None,
            transformation_notes: None,
        }
    }

    #[tokio::test]
    async fn test_inserts_new_opportunity_and_marks_row() {
        let target = MemoryTarget::new();
        target.seed_staged_row(staged(&legacy(1), false)).await;

        let mut transformer =
            OpportunityTransformer::new(Arc::new(target.clone()), settings(100));
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();

        let created = target.opportunity_by_legacy_id(1).await.unwrap();
        assert_eq!(created.opportunity_number.as_deref(), Some("ED-25-001"));
        let row = target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(1))
            .await
            .unwrap();
        assert!(row.transformed_at.is_some());
        assert!(row.transformation_notes.is_none());
        assert_eq!(metrics.get("opportunity", Counter::Inserted), 1);
    }

    #[tokio::test]
    async fn test_update_reuses_domain_identity() {
        let target = MemoryTarget::new();
        target.seed_staged_row(staged(&legacy(1), false)).await;

        let mut transformer =
            OpportunityTransformer::new(Arc::new(target.clone()), settings(100));
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();
        let first = target.opportunity_by_legacy_id(1).await.unwrap();

        // Sync re-queues the row with a changed title
        let mut changed = legacy(1);
        changed.opp_title = Some("Adult Literacy Program II".to_string());
        target.seed_staged_row(staged(&changed, false)).await;

        let mut transformer =
            OpportunityTransformer::new(Arc::new(target.clone()), settings(100));
        transformer.transform_records(&mut metrics).await.unwrap();

        let updated = target.opportunity_by_legacy_id(1).await.unwrap();
        assert_eq!(updated.opportunity_id, first.opportunity_id);
        assert_eq!(
            updated.opportunity_title.as_deref(),
            Some("Adult Literacy Program II")
        );
        assert_eq!(metrics.get("opportunity", Counter::Updated), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_domain_record() {
        let target = MemoryTarget::new();
        target.seed_staged_row(staged(&legacy(1), false)).await;
        let mut transformer =
            OpportunityTransformer::new(Arc::new(target.clone()), settings(100));
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();
        assert!(target.opportunity_by_legacy_id(1).await.is_some());

        target.seed_staged_row(staged(&legacy(1), true)).await;
        let mut transformer =
            OpportunityTransformer::new(Arc::new(target.clone()), settings(100));
        transformer.transform_records(&mut metrics).await.unwrap();

        assert!(target.opportunity_by_legacy_id(1).await.is_none());
        assert_eq!(metrics.get("opportunity", Counter::Deleted), 1);
    }

    #[tokio::test]
    async fn test_orphaned_delete_is_a_tagged_skip() {
        let target = MemoryTarget::new();
        target.seed_staged_row(staged(&legacy(1), true)).await;

        let mut transformer =
            OpportunityTransformer::new(Arc::new(target.clone()), settings(100));
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();

        let row = target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(1))
            .await
            .unwrap();
        assert!(row.transformed_at.is_some());
        assert_eq!(
            row.transformation_notes.as_deref(),
            Some("orphaned_delete_record")
        );
        assert_eq!(metrics.get("opportunity", Counter::DeleteOrphansSkipped), 1);
        assert_eq!(metrics.get("opportunity", Counter::Deleted), 0);
        assert_eq!(metrics.get("opportunity", Counter::Errored), 0);
    }

    #[tokio::test]
    async fn test_bad_record_is_isolated_and_left_pending() {
        let target = MemoryTarget::new();
        let mut bad = legacy(1);
        bad.opp_category = Some("Z".to_string());
        target.seed_staged_row(staged(&bad, false)).await;
        target.seed_staged_row(staged(&legacy(2), false)).await;
        target.seed_staged_row(staged(&legacy(3), false)).await;

        let mut transformer =
            OpportunityTransformer::new(Arc::new(target.clone()), settings(100));
        let mut metrics = RunMetrics::new();
        transformer.transform_records(&mut metrics).await.unwrap();

        assert_eq!(metrics.get("opportunity", Counter::Processed), 3);
        assert_eq!(metrics.get("opportunity", Counter::Inserted), 2);
        assert_eq!(metrics.get("opportunity", Counter::Errored), 1);

        // The bad row stays pending; the good rows are marked
        let bad_row = target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(1))
            .await
            .unwrap();
        assert!(bad_row.transformed_at.is_none());
        let good_row = target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(2))
            .await
            .unwrap();
        assert!(good_row.transformed_at.is_some());

        // The next run retries exactly the bad row
        let mut transformer =
            OpportunityTransformer::new(Arc::new(target.clone()), settings(100));
        let mut retry_metrics = RunMetrics::new();
        transformer
            .transform_records(&mut retry_metrics)
            .await
            .unwrap();
        assert_eq!(retry_metrics.get("opportunity", Counter::Processed), 1);
        assert_eq!(retry_metrics.get("opportunity", Counter::Errored), 1);
    }

    #[tokio::test]
    async fn test_driver_loops_until_queue_is_drained() {
        let target = MemoryTarget::new();
        for id in 1..=7 {
            target.seed_staged_row(staged(&legacy(id), false)).await;
        }

        let mut transformer = OpportunityTransformer::new(Arc::new(target.clone()), settings(3));
        let mut metrics = RunMetrics::new();
        run_to_completion(&mut transformer, &mut metrics)
            .await
            .unwrap();

        assert_eq!(metrics.get("opportunity", Counter::Inserted), 7);
        assert_eq!(target.opportunities().await.len(), 7);
    }

    #[tokio::test]
    async fn test_max_records_cap_stops_the_run() {
        let target = MemoryTarget::new();
        for id in 1..=10 {
            target.seed_staged_row(staged(&legacy(id), false)).await;
        }

        let mut transformer = OpportunityTransformer::new(
            Arc::new(target.clone()),
            BatchSettings::new(4, Some(6), FetchOrder::NewestFirst),
        );
        let mut metrics = RunMetrics::new();
        run_to_completion(&mut transformer, &mut metrics)
            .await
            .unwrap();

        assert_eq!(metrics.get("opportunity", Counter::Processed), 6);
        assert_eq!(target.opportunities().await.len(), 6);
    }
}
