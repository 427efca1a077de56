//! Store abstraction traits
//!
//! This module defines the traits the pipeline runs against: a read-only
//! [`SourceStore`] over the foreign legacy schema and a [`TargetStore`]
//! owning the staging and domain schemas. Both are trait objects so the
//! engines can run identically against PostgreSQL in production and the
//! in-memory adapters in tests and rehearsal runs.

use crate::domain::enums::LinkEntity;
use crate::domain::ids::{
    InstructionId, LinkId, OpportunityId, SummaryId,
};
use crate::domain::instruction::CompetitionInstruction;
use crate::domain::link::SummaryLink;
use crate::domain::opportunity::Opportunity;
use crate::domain::summary::OpportunitySummary;
use crate::domain::{Result, StrataError};
use crate::staging::key::LegacyKey;
use crate::staging::row::{SkipReason, StagedRow};
use crate::staging::tables::StagingTable;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Order in which pending rows are fetched into a transformation batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchOrder {
    /// Most recently updated staging rows first
    #[default]
    NewestFirst,
    /// Oldest staging rows first
    OldestFirst,
}

impl FetchOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOrder::NewestFirst => "newest_first",
            FetchOrder::OldestFirst => "oldest_first",
        }
    }
}

impl fmt::Display for FetchOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FetchOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "newest_first" => Ok(FetchOrder::NewestFirst),
            "oldest_first" => Ok(FetchOrder::OldestFirst),
            other => Err(format!("unknown fetch order: {other}")),
        }
    }
}

/// Narrow key/stamp projection of one source row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyStamp {
    pub key: LegacyKey,
    pub last_upd_date: Option<NaiveDateTime>,
}

/// Narrow key/stamp projection of one staging row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagingKeyStamp {
    pub key: LegacyKey,
    pub last_upd_date: Option<NaiveDateTime>,
    pub is_deleted: bool,
}

/// One full source row as fetched for staging
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub key: LegacyKey,
    pub last_upd_date: Option<NaiveDateTime>,
    /// All mirrored columns as a JSON document
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl SourceRow {
    /// Builds a source row by serializing a typed legacy record
    ///
    /// Used by the in-memory source and test fixtures; the PostgreSQL
    /// source builds payloads straight off the wire.
    pub fn from_record<T: Serialize>(
        key: LegacyKey,
        last_upd_date: Option<NaiveDateTime>,
        record: &T,
    ) -> Result<Self> {
        let value = serde_json::to_value(record)?;
        let payload = match value {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(StrataError::Serialization(format!(
                    "legacy record serialized to non-object JSON: {other}"
                )))
            }
        };
        Ok(Self {
            key,
            last_upd_date,
            payload,
        })
    }
}

/// A pending opportunity row joined to its current domain counterpart
#[derive(Debug, Clone)]
pub struct PendingOpportunity {
    pub staged: StagedRow,
    pub existing: Option<Opportunity>,
}

/// A pending summary row joined to its counterpart and resolved parent
#[derive(Debug, Clone)]
pub struct PendingSummary {
    pub staged: StagedRow,
    pub existing: Option<OpportunitySummary>,
    /// The parent opportunity's identity, when it has been transformed
    pub parent: Option<OpportunityId>,
}

/// A pending link row with its resolved parent summary and siblings
///
/// `existing` carries every domain link the parent summary already holds
/// for the same entity kind. The transformer needs the full set because
/// several legacy link rows can map onto one deduplicated domain link.
#[derive(Debug, Clone)]
pub struct PendingLink {
    pub staged: StagedRow,
    pub existing: Vec<SummaryLink>,
    /// The parent summary's identity, matched on the staged row's lineage
    pub parent: Option<SummaryId>,
}

/// A pending instruction row joined to its counterpart
///
/// The counterpart match is the deterministic derived key: the domain
/// instruction for the same legacy competition.
#[derive(Debug, Clone)]
pub struct PendingInstruction {
    pub staged: StagedRow,
    pub existing: Option<CompetitionInstruction>,
}

/// One domain-record write produced by a transformer
#[derive(Debug, Clone)]
pub enum DomainWrite {
    UpsertOpportunity(Opportunity),
    DeleteOpportunity(OpportunityId),
    UpsertSummary(OpportunitySummary),
    DeleteSummary(SummaryId),
    UpsertLink(SummaryLink),
    DeleteLink(LinkId),
    UpsertInstruction(CompetitionInstruction),
    DeleteInstruction(InstructionId),
}

/// Marks one staging row transformed, optionally with a skip tag
#[derive(Debug, Clone)]
pub struct StagingMark {
    pub table: StagingTable,
    pub key: LegacyKey,
    pub transformed_at: DateTime<Utc>,
    pub skip: Option<SkipReason>,
}

/// All writes from one `transform_records` call, applied in one transaction
///
/// Rows that errored appear in neither list: they stay pending and are
/// retried on the next run.
#[derive(Debug, Clone, Default)]
pub struct TransformBatch {
    pub writes: Vec<DomainWrite>,
    pub marks: Vec<StagingMark>,
}

impl TransformBatch {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.marks.is_empty()
    }
}

/// Row counts for one staging table, for status reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableStatus {
    pub table: StagingTable,
    pub total_rows: u64,
    pub pending_rows: u64,
    pub deleted_rows: u64,
}

/// Read-only access to the foreign legacy schema
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Test connectivity to the source
    async fn check_connection(&self) -> Result<()>;

    /// Load the narrow key/stamp projection of one source table
    ///
    /// Returns every primary key with its last-modified stamp. This is the
    /// sync engine's memory-bounding projection; full rows are fetched per
    /// chunk afterwards.
    async fn key_listing(&self, table: StagingTable) -> Result<Vec<KeyStamp>>;

    /// Fetch full rows for a chunk of keys
    ///
    /// Keys missing at fetch time (the row vanished mid-run) are simply
    /// absent from the result; the next sync sweeps them as deletes.
    async fn fetch_rows(&self, table: StagingTable, keys: &[LegacyKey]) -> Result<Vec<SourceRow>>;
}

/// The staging and domain schemas owned by this pipeline
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Test connectivity to the target
    async fn check_connection(&self) -> Result<()>;

    /// Apply the idempotent schema migration
    async fn ensure_schema(&self) -> Result<()>;

    /// Load the narrow key/stamp projection of one staging table
    async fn staging_key_listing(&self, table: StagingTable) -> Result<Vec<StagingKeyStamp>>;

    /// Upsert one chunk of mirrored rows in a single transaction
    ///
    /// Every row lands with cleared bookkeeping columns (`is_deleted`
    /// false, `deleted_at`/`transformed_at`/`transformation_notes` null),
    /// re-queueing it for transformation.
    async fn upsert_staging_rows(&self, table: StagingTable, rows: Vec<SourceRow>) -> Result<()>;

    /// Soft-delete one chunk of staging rows in a single transaction
    ///
    /// Sets `is_deleted` and `deleted_at`, and clears the transformation
    /// mark so the delete is picked up by the transformation engine.
    async fn mark_staging_deleted(
        &self,
        table: StagingTable,
        keys: &[LegacyKey],
        deleted_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Fetch a batch of pending opportunity rows
    async fn fetch_pending_opportunities(
        &self,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingOpportunity>>;

    /// Fetch a batch of pending summary rows across the current and
    /// historical tables
    async fn fetch_pending_summaries(
        &self,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingSummary>>;

    /// Fetch a batch of pending link rows of one kind across the current
    /// and historical tables
    async fn fetch_pending_links(
        &self,
        entity: LinkEntity,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingLink>>;

    /// Fetch a batch of pending instruction rows
    async fn fetch_pending_instructions(
        &self,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingInstruction>>;

    /// Apply one transformation batch in a single transaction
    ///
    /// Domain writes and staging marks commit or roll back together; a
    /// mid-batch failure leaves every row of the batch pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is partially
    /// applied.
    async fn apply_transform_batch(&self, batch: TransformBatch) -> Result<()>;

    /// Row counts per staging table, for status reporting
    async fn staging_status(&self) -> Result<Vec<TableStatus>>;
}
