//! Transformation dispatcher contract
//!
//! Every entity transformer implements [`EntityTransformer`]: fetch one
//! bounded batch of pending staging rows, process each record purely, then
//! apply the accumulated domain writes and staging marks in one
//! transaction. The orchestrator drives all transformers through the same
//! [`run_to_completion`] loop.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapters::store::{DomainWrite, FetchOrder, StagingMark, TransformBatch};
use crate::core::metrics::{Counter, RunMetrics};
use crate::domain::errors::TransformError;
use crate::domain::Result;
use crate::staging::row::SkipReason;
use crate::staging::StagedRow;

/// Batch sizing and fetch ordering for one transformer
#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    /// Rows per `transform_records` call
    pub batch_size: usize,
    /// Optional cap on total rows across one run, for controlled manual
    /// testing
    pub max_records: Option<u64>,
    pub order: FetchOrder,
}

impl BatchSettings {
    pub fn new(batch_size: usize, max_records: Option<u64>, order: FetchOrder) -> Self {
        Self {
            batch_size: batch_size.max(1),
            max_records,
            order,
        }
    }
}

/// Tracks batch fullness and the optional total-records cap
///
/// `has_more` reports true only while the last fetch came back full and the
/// cap leaves room, which is what keeps the driver loop bounded: an empty
/// or short fetch means the pending queue is drained.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    settings: BatchSettings,
    fetched: u64,
    last_fetch_full: bool,
}

impl BatchProgress {
    pub fn new(settings: BatchSettings) -> Self {
        Self {
            settings,
            fetched: 0,
            last_fetch_full: false,
        }
    }

    pub fn order(&self) -> FetchOrder {
        self.settings.order
    }

    /// Rows the next fetch may request; zero once the cap is reached
    pub fn next_fetch_size(&self) -> usize {
        match self.settings.max_records {
            None => self.settings.batch_size,
            Some(cap) => {
                let remaining = cap.saturating_sub(self.fetched);
                let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
                self.settings.batch_size.min(remaining)
            }
        }
    }

    /// Record the outcome of one fetch
    pub fn record_fetch(&mut self, requested: usize, received: usize) {
        self.fetched += received as u64;
        self.last_fetch_full = requested > 0 && received == requested;
    }

    pub fn has_more(&self) -> bool {
        self.last_fetch_full && self.next_fetch_size() > 0
    }
}

/// What processing one record decided
///
/// Produced by the pure per-record functions; [`fold_outcome`] turns it
/// into batch writes, a staging mark, and counter increments. An errored
/// record produces no outcome at all: it stays pending and is retried on
/// the next run.
#[derive(Debug)]
pub enum RecordOutcome {
    /// A new domain record
    Inserted(DomainWrite),
    /// An existing domain record rebuilt from the staged row
    Updated(DomainWrite),
    /// The domain counterpart is removed
    Deleted(DomainWrite),
    /// Deliberately not applied, with the tag explaining why
    Skipped(SkipReason),
}

/// Folds one record's outcome into the batch and counters
///
/// Every outcome marks the staging row transformed; skips carry their tag
/// into `transformation_notes`.
pub fn fold_outcome(
    batch: &mut TransformBatch,
    metrics: &mut RunMetrics,
    entity: &str,
    staged: &StagedRow,
    outcome: RecordOutcome,
    now: DateTime<Utc>,
) {
    let skip = match outcome {
        RecordOutcome::Inserted(write) => {
            batch.writes.push(write);
            metrics.incr(entity, Counter::Inserted);
            None
        }
        RecordOutcome::Updated(write) => {
            batch.writes.push(write);
            metrics.incr(entity, Counter::Updated);
            None
        }
        RecordOutcome::Deleted(write) => {
            batch.writes.push(write);
            metrics.incr(entity, Counter::Deleted);
            None
        }
        RecordOutcome::Skipped(reason) => {
            let counter = match reason {
                SkipReason::OrphanedDeleteRecord => Counter::DeleteOrphansSkipped,
                SkipReason::OrphanedHistoricalRecord => Counter::HistoricalOrphansSkipped,
            };
            metrics.incr(entity, counter);
            Some(reason)
        }
    };
    batch.marks.push(StagingMark {
        table: staged.table,
        key: staged.key,
        transformed_at: now,
        skip,
    });
}

/// Logs and counts one per-record failure, leaving the row pending
pub fn record_error(metrics: &mut RunMetrics, entity: &str, staged: &StagedRow, error: &TransformError) {
    tracing::error!(
        entity,
        table = staged.table.as_str(),
        key = %staged.key,
        error = %error,
        "Record failed transformation; leaving it pending for retry"
    );
    metrics.incr(entity, Counter::Errored);
}

/// Contract all entity transformers implement
#[async_trait]
pub trait EntityTransformer: Send {
    /// Metric entity name, also used in logs
    fn entity(&self) -> &'static str;

    /// True while the last batch came back full and the cap leaves room
    fn has_more_to_process(&self) -> bool;

    /// Fetch and process one batch of pending staging rows
    ///
    /// Exactly one fetch and one transactional apply per call. Per-record
    /// failures are counted and the rows left pending; storage failures
    /// propagate and abort this transformer's loop.
    async fn transform_records(&mut self, metrics: &mut RunMetrics) -> Result<()>;
}

/// Drives one transformer until it reports no more pending work
pub async fn run_to_completion(
    transformer: &mut dyn EntityTransformer,
    metrics: &mut RunMetrics,
) -> Result<()> {
    let mut batches = 0u64;
    loop {
        transformer.transform_records(metrics).await?;
        batches += 1;
        if !transformer.has_more_to_process() {
            break;
        }
    }
    tracing::debug!(
        entity = transformer.entity(),
        batches,
        "Transformer drained its pending queue"
    );
    Ok(())
}
