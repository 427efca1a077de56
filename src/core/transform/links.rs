//! Summary link transformer
//!
//! One transformer covers all three link kinds (applicant type, funding
//! category, funding instrument); the entity decides which staging tables
//! feed it and which code mapping applies.
//!
//! Several legacy link rows can carry the same code for one summary. The
//! domain keeps at most one link per `(summary, value)`, so a row whose
//! value already exists merges onto that link instead of inserting a
//! duplicate. Deletes match strictly by the legacy link id: deleting one
//! duplicate row must not remove a link another row still backs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapters::store::{DomainWrite, PendingLink, TargetStore, TransformBatch};
use crate::core::metrics::{Counter, RunMetrics};
use crate::core::transform::dispatcher::{
    fold_outcome, record_error, BatchProgress, BatchSettings, EntityTransformer, RecordOutcome,
};
use crate::domain::enums::{LinkEntity, LinkValue};
use crate::domain::errors::TransformError;
use crate::domain::ids::SummaryId;
use crate::domain::link::SummaryLink;
use crate::domain::Result;
use crate::staging::normalize::normalize_action_code_to_is_deleted;
use crate::staging::records::LegacyLink;
use crate::staging::row::SkipReason;

/// Links built earlier in the current batch, keyed by their dedupe key
///
/// Two new rows with the same value in one batch must resolve to one
/// domain link; the store snapshot cannot see writes the batch has not
/// applied yet.
type BatchLinks = HashMap<(SummaryId, LinkValue), SummaryLink>;

/// Transforms staged link rows of one entity kind into summary links
pub struct LinkTransformer {
    target: Arc<dyn TargetStore>,
    entity: LinkEntity,
    progress: BatchProgress,
}

impl LinkTransformer {
    pub fn new(target: Arc<dyn TargetStore>, entity: LinkEntity, settings: BatchSettings) -> Self {
        Self {
            target,
            entity,
            progress: BatchProgress::new(settings),
        }
    }
}

/// Decides what one pending link row becomes
fn process_one(
    pending: &PendingLink,
    entity: LinkEntity,
    built: &mut BatchLinks,
    now: DateTime<Utc>,
) -> std::result::Result<RecordOutcome, TransformError> {
    let record: LegacyLink = pending.staged.decode(entity.as_str())?;

    let action_deleted =
        normalize_action_code_to_is_deleted(record.action_type.as_deref())?.unwrap_or(false);
    if pending.staged.is_deleted || action_deleted {
        return Ok(
            match pending
                .existing
                .iter()
                .find(|link| link.legacy_link_id == record.link_id)
            {
                Some(existing) => RecordOutcome::Deleted(DomainWrite::DeleteLink(existing.link_id)),
                None => RecordOutcome::Skipped(SkipReason::OrphanedDeleteRecord),
            },
        );
    }

    let Some(parent) = pending.parent else {
        if pending.staged.table.is_historical() {
            return Ok(RecordOutcome::Skipped(SkipReason::OrphanedHistoricalRecord));
        }
        return Err(TransformError::MissingParent {
            entity: entity.as_str(),
        });
    };

    let code = record
        .code
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(TransformError::MissingRequiredField {
            entity: entity.as_str(),
            field: "code",
        })?;
    let value = entity.map_code(code)?;

    // Counterpart: the same legacy row on replay, else the deduplicated
    // link already holding this value, else one built earlier this batch.
    let existing = pending
        .existing
        .iter()
        .find(|link| link.legacy_link_id == record.link_id)
        .or_else(|| pending.existing.iter().find(|link| link.value == value))
        .cloned()
        .or_else(|| built.get(&(parent, value)).cloned());

    let was_update = existing.is_some();
    let link = SummaryLink::build(parent, record.link_id, value, existing.as_ref(), now);
    built.insert((parent, value), link.clone());

    Ok(if was_update {
        RecordOutcome::Updated(DomainWrite::UpsertLink(link))
    } else {
        RecordOutcome::Inserted(DomainWrite::UpsertLink(link))
    })
}

#[async_trait]
impl EntityTransformer for LinkTransformer {
    fn entity(&self) -> &'static str {
        self.entity.as_str()
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
            .fetch_pending_links(self.entity, fetch_size, self.progress.order())
            .await?;
        self.progress.record_fetch(fetch_size, pending.len());
        if pending.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            entity = self.entity.as_str(),
            count = pending.len(),
            "Processing link batch"
        );

        let now = Utc::now();
        let mut batch = TransformBatch::default();
        let mut built = BatchLinks::new();
        for item in &pending {
            metrics.incr(self.entity(), Counter::Processed);
            match process_one(item, self.entity, &mut built, now) {
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
