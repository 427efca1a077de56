//! Competition instruction transformer
//!
//! Instructions are the one entity with a side effect outside the target
//! database: the document bytes go to blob storage, the row keeps the
//! metadata. The two cannot share a transaction, so the order of
//! operations carries the consistency:
//!
//! 1. Write new blobs first. A write failure aborts the batch before any
//!    row is marked, so the rows stay pending and the next run retries.
//! 2. Commit the metadata rows and staging marks together.
//! 3. Remove stale blobs last, tolerating failures. A leaked orphan blob
//!    is harmless; a dangling metadata row pointing at nothing is not.
//!
//! When the stored checksum and path both match the incoming document,
//! the blob write is skipped entirely.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapters::blob::BlobStore;
use crate::adapters::store::{DomainWrite, PendingInstruction, TargetStore, TransformBatch};
use crate::core::metrics::{Counter, RunMetrics};
use crate::core::transform::dispatcher::{
    fold_outcome, record_error, BatchProgress, BatchSettings, EntityTransformer, RecordOutcome,
};
use crate::domain::errors::TransformError;
use crate::domain::ids::InstructionId;
use crate::domain::instruction::CompetitionInstruction;
use crate::domain::Result;
use crate::staging::records::LegacyInstruction;
use crate::staging::row::SkipReason;

const ENTITY: &str = "instruction";

/// Instructions built earlier in the current batch, keyed by competition
///
/// The domain keeps one instruction per competition. When a batch carries
/// two rows for the same competition, the second must reuse the first's
/// identity instead of colliding on the uniqueness constraint.
type BatchInstructions = HashMap<i64, CompetitionInstruction>;

/// What one pending instruction row asks of storage
enum InstructionPlan {
    Upsert {
        instruction: CompetitionInstruction,
        /// Document bytes to write, or None when the stored blob already
        /// matches checksum and path
        bytes: Option<Vec<u8>>,
        /// Previous blob location to remove after commit, when the path moved
        stale_path: Option<String>,
        was_update: bool,
    },
    Delete {
        instruction_id: InstructionId,
        storage_path: String,
    },
    Skip(SkipReason),
}

/// Transforms staged instruction rows into competition instructions
pub struct InstructionTransformer {
    target: Arc<dyn TargetStore>,
    blobs: Arc<dyn BlobStore>,
    progress: BatchProgress,
}

impl InstructionTransformer {
    pub fn new(
        target: Arc<dyn TargetStore>,
        blobs: Arc<dyn BlobStore>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            target,
            blobs,
            progress: BatchProgress::new(settings),
        }
    }
}

/// Decides what one pending instruction row becomes
fn process_one(
    pending: &PendingInstruction,
    built: &BatchInstructions,
    now: DateTime<Utc>,
) -> std::result::Result<InstructionPlan, TransformError> {
    if pending.staged.is_deleted {
        return Ok(match &pending.existing {
            Some(existing) => InstructionPlan::Delete {
                instruction_id: existing.instruction_id,
                storage_path: existing.storage_path.clone(),
            },
            None => InstructionPlan::Skip(SkipReason::OrphanedDeleteRecord),
        });
    }

    let mut record: LegacyInstruction = pending.staged.decode(ENTITY)?;
    let existing = pending
        .existing
        .clone()
        .or_else(|| built.get(&record.competition_id).cloned());

    let instruction = CompetitionInstruction::from_legacy(&record, existing.as_ref(), now)?;
    let bytes = record.file_lob.take().unwrap_or_default();

    let blob_unchanged = existing.as_ref().is_some_and(|e| {
        e.checksum_sha256 == instruction.checksum_sha256
            && e.storage_path == instruction.storage_path
    });
    let stale_path = existing
        .as_ref()
        .filter(|e| e.storage_path != instruction.storage_path)
        .map(|e| e.storage_path.clone());

    Ok(InstructionPlan::Upsert {
        was_update: existing.is_some(),
        bytes: (!blob_unchanged).then_some(bytes),
        stale_path,
        instruction,
    })
}

#[async_trait]
impl EntityTransformer for InstructionTransformer {
    fn entity(&self) -> &'static str {
        ENTITY
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
            .fetch_pending_instructions(fetch_size, self.progress.order())
            .await?;
        self.progress.record_fetch(fetch_size, pending.len());
        if pending.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = pending.len(), "Processing instruction batch");

        let now = Utc::now();
        let mut batch = TransformBatch::default();
        let mut built = BatchInstructions::new();
        let mut stale_blobs: Vec<String> = Vec::new();
        for item in &pending {
            metrics.incr(ENTITY, Counter::Processed);
            match process_one(item, &built, now) {
                Ok(InstructionPlan::Upsert {
                    instruction,
                    bytes,
                    stale_path,
                    was_update,
                }) => {
                    if let Some(bytes) = bytes {
                        self.blobs
                            .write(&instruction.storage_path, &bytes, &instruction.content_type)
                            .await?;
                    }
                    stale_blobs.extend(stale_path);
                    built.insert(instruction.legacy_competition_id, instruction.clone());
                    let write = DomainWrite::UpsertInstruction(instruction);
                    let outcome = if was_update {
                        RecordOutcome::Updated(write)
                    } else {
                        RecordOutcome::Inserted(write)
                    };
                    fold_outcome(&mut batch, metrics, ENTITY, &item.staged, outcome, now);
                }
                Ok(InstructionPlan::Delete {
                    instruction_id,
                    storage_path,
                }) => {
                    stale_blobs.push(storage_path);
                    let outcome =
                        RecordOutcome::Deleted(DomainWrite::DeleteInstruction(instruction_id));
                    fold_outcome(&mut batch, metrics, ENTITY, &item.staged, outcome, now);
                }
                Ok(InstructionPlan::Skip(reason)) => {
                    let outcome = RecordOutcome::Skipped(reason);
                    fold_outcome(&mut batch, metrics, ENTITY, &item.staged, outcome, now);
                }
                Err(error) => record_error(metrics, ENTITY, &item.staged, &error),
            }
        }

        if !batch.is_empty() {
            self.target.apply_transform_batch(batch).await?;
        }

        // Blob removal comes after the commit and never fails the run; an
        // orphaned blob is swept by the next full replay at worst.
        for path in stale_blobs {
            if let Err(error) = self.blobs.delete(&path).await {
                tracing::warn!(path, error = %error, "Failed to remove stale instruction blob");
            }
        }
        Ok(())
    }
}
