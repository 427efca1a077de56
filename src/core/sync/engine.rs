//! Staging synchronization engine
//!
//! Mirrors the configured legacy tables into the staging schema: computes a
//! key-level insert/update/delete plan per table, then applies it in chunks
//! so transaction size stays bounded.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::adapters::store::{SourceRow, SourceStore, TargetStore};
use crate::config::SyncConfig;
use crate::core::metrics::{Counter, RunMetrics};
use crate::core::sync::plan;
use crate::domain::{Result, StrataError};
use crate::staging::{LegacyKey, StagingTable};

/// Mirrors legacy source tables into staging
pub struct SyncEngine {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    config: SyncConfig,
}

impl SyncEngine {
    /// Create a new synchronization engine
    pub fn new(
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    /// Resolve the tables this run will mirror, in canonical order
    ///
    /// An empty `sync.tables` list means all known tables.
    ///
    /// # Errors
    ///
    /// Returns `StrataError::Configuration` if a configured table name is
    /// not a known staging table.
    pub fn tables(&self) -> Result<Vec<StagingTable>> {
        if self.config.tables.is_empty() {
            return Ok(StagingTable::all().to_vec());
        }
        self.config
            .tables
            .iter()
            .map(|name| {
                name.parse::<StagingTable>()
                    .map_err(StrataError::Configuration)
            })
            .collect()
    }

    /// Synchronize one table pair from source into staging
    ///
    /// Loads the narrow key/stamp listings from both sides, diffs them, then
    /// applies upserts and soft deletes in chunks of `sync.chunk_size` rows.
    /// Every applied upsert clears the row's bookkeeping columns, so changed
    /// rows re-enter the transformation queue; soft deletes do the same while
    /// setting the deletion marker. Counters land in `metrics` under the
    /// table's `staging.*` entity.
    ///
    /// # Errors
    ///
    /// Any listing, fetch, or write failure aborts this table and
    /// propagates; chunks already committed stay committed and are
    /// reconciled by the next run.
    pub async fn sync_table(&self, table: StagingTable, metrics: &mut RunMetrics) -> Result<()> {
        let entity = table.metric_entity();

        let source_listing = self.source.key_listing(table).await?;
        let staging_listing = self.target.staging_key_listing(table).await?;

        let plan = plan::compute(&source_listing, &staging_listing);

        tracing::info!(
            table = table.as_str(),
            source_rows = source_listing.len(),
            staging_rows = staging_listing.len(),
            inserts = plan.inserts.len(),
            updates = plan.updates.len(),
            deletes = plan.deletes.len(),
            "Computed sync plan"
        );

        if plan.is_noop() {
            return Ok(());
        }

        let chunk_size = self.config.chunk_size.max(1);
        let excluded = self.excluded_columns(table);
        let insert_keys: BTreeSet<LegacyKey> = plan.inserts.iter().copied().collect();

        for chunk in plan.upsert_keys().chunks(chunk_size) {
            let mut rows = self.source.fetch_rows(table, chunk).await?;
            if rows.len() < chunk.len() {
                tracing::warn!(
                    table = table.as_str(),
                    listed = chunk.len(),
                    fetched = rows.len(),
                    "Rows vanished between listing and fetch; next run sweeps them as deletes"
                );
            }
            if rows.is_empty() {
                continue;
            }

            for row in &mut rows {
                clear_excluded_columns(row, excluded);
            }

            let applied = rows.len() as u64;
            let inserted = rows
                .iter()
                .filter(|row| insert_keys.contains(&row.key))
                .count() as u64;

            self.target.upsert_staging_rows(table, rows).await?;

            metrics.add(&entity, Counter::Processed, applied);
            metrics.add(&entity, Counter::Inserted, inserted);
            metrics.add(&entity, Counter::Updated, applied - inserted);
            metrics.incr(&entity, Counter::ChunksApplied);

            tracing::debug!(table = table.as_str(), rows = applied, "Applied staging chunk");
        }

        if !plan.deletes.is_empty() {
            let deleted_at = Utc::now();
            for chunk in plan.deletes.chunks(chunk_size) {
                self.target
                    .mark_staging_deleted(table, chunk, deleted_at)
                    .await?;

                metrics.add(&entity, Counter::Processed, chunk.len() as u64);
                metrics.add(&entity, Counter::Deleted, chunk.len() as u64);
                metrics.incr(&entity, Counter::ChunksApplied);
            }

            tracing::info!(
                table = table.as_str(),
                rows = plan.deletes.len(),
                "Soft-deleted staging rows missing from source"
            );
        }

        Ok(())
    }

    fn excluded_columns(&self, table: StagingTable) -> &[String] {
        self.config
            .excluded_columns
            .get(table.as_str())
            .map(|columns| columns.as_slice())
            .unwrap_or(&[])
    }
}

/// Null out mirrored columns that are configured to never replicate
fn clear_excluded_columns(row: &mut SourceRow, excluded: &[String]) {
    for column in excluded {
        if let Some(value) = row.payload.get_mut(column) {
            *value = Value::Null;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemorySource, MemoryTarget};
    use crate::adapters::store::KeyStamp;
    use crate::staging::{LegacyOpportunity, StagedRow};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashMap;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    fn opportunity(id: i64) -> LegacyOpportunity {
        LegacyOpportunity {
            opportunity_id: id,
            opp_number: Some(format!("TEST-{id:05}")),
            ..Default::default()
        }
    }

    fn staged(id: i64, day: u32, record: &LegacyOpportunity) -> StagedRow {
        StagedRow {
            table: StagingTable::Opportunity,
            key: LegacyKey::current(id),
            payload: serde_json::to_value(record).unwrap(),
            last_upd_date: Some(ts(day)),
            is_deleted: false,
            deleted_at: None,
            transformed_at: None,
            transformation_notes: None,
        }
    }

    fn engine_with(source: &MemorySource, target: &MemoryTarget, config: SyncConfig) -> SyncEngine {
        SyncEngine::new(Arc::new(source.clone()), Arc::new(target.clone()), config)
    }

    #[tokio::test]
    async fn test_sync_inserts_updates_and_deletes() {
        let source = MemorySource::new();
        let target = MemoryTarget::new();
        for id in 1..=4 {
            source
                .seed_record(
                    StagingTable::Opportunity,
                    LegacyKey::current(id),
                    Some(ts(if id == 4 { 9 } else { 5 })),
                    &opportunity(id),
                )
                .await
                .unwrap();
        }
        for id in 3..=5 {
            target.seed_staged_row(staged(id, 5, &opportunity(id))).await;
        }

        let engine = engine_with(&source, &target, SyncConfig::default());
        let mut metrics = RunMetrics::new();
        engine
            .sync_table(StagingTable::Opportunity, &mut metrics)
            .await
            .unwrap();

        let entity = StagingTable::Opportunity.metric_entity();
        assert_eq!(metrics.get(&entity, Counter::Inserted), 2);
        assert_eq!(metrics.get(&entity, Counter::Updated), 1);
        assert_eq!(metrics.get(&entity, Counter::Deleted), 1);

        let rows = target.staging_rows(StagingTable::Opportunity).await;
        assert_eq!(rows.len(), 5);
        let deleted = target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(5))
            .await
            .unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.deleted_at.is_some());
    }

    #[tokio::test]
    async fn test_second_run_with_no_source_changes_writes_nothing() {
        let source = MemorySource::new();
        let target = MemoryTarget::new();
        for id in 1..=6 {
            source
                .seed_record(
                    StagingTable::Opportunity,
                    LegacyKey::current(id),
                    Some(ts(5)),
                    &opportunity(id),
                )
                .await
                .unwrap();
        }

        let engine = engine_with(&source, &target, SyncConfig::default());
        let mut first = RunMetrics::new();
        engine
            .sync_table(StagingTable::Opportunity, &mut first)
            .await
            .unwrap();
        let after_first = target.staging_rows(StagingTable::Opportunity).await;

        let mut second = RunMetrics::new();
        engine
            .sync_table(StagingTable::Opportunity, &mut second)
            .await
            .unwrap();

        let entity = StagingTable::Opportunity.metric_entity();
        assert_eq!(second.get(&entity, Counter::Processed), 0);
        assert_eq!(second.get(&entity, Counter::ChunksApplied), 0);
        assert_eq!(
            target.staging_rows(StagingTable::Opportunity).await,
            after_first
        );
    }

    #[tokio::test]
    async fn test_sync_resurrects_soft_deleted_row() {
        let source = MemorySource::new();
        let target = MemoryTarget::new();
        source
            .seed_record(
                StagingTable::Opportunity,
                LegacyKey::current(1),
                Some(ts(5)),
                &opportunity(1),
            )
            .await
            .unwrap();
        target.seed_staged_row(staged(1, 5, &opportunity(1))).await;
        target
            .mark_staging_deleted(
                StagingTable::Opportunity,
                &[LegacyKey::current(1)],
                Utc::now(),
            )
            .await
            .unwrap();

        let engine = engine_with(&source, &target, SyncConfig::default());
        let mut metrics = RunMetrics::new();
        engine
            .sync_table(StagingTable::Opportunity, &mut metrics)
            .await
            .unwrap();

        let row = target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(1))
            .await
            .unwrap();
        assert!(!row.is_deleted);
        assert!(row.deleted_at.is_none());
        assert!(row.transformed_at.is_none());
        let entity = StagingTable::Opportunity.metric_entity();
        assert_eq!(metrics.get(&entity, Counter::Updated), 1);
    }

    #[tokio::test]
    async fn test_chunk_size_changes_batching_not_outcome() {
        let source = MemorySource::new();
        for id in 1..=7 {
            source
                .seed_record(
                    StagingTable::Opportunity,
                    LegacyKey::current(id),
                    Some(ts(5)),
                    &opportunity(id),
                )
                .await
                .unwrap();
        }

        let chunked_target = MemoryTarget::new();
        let engine = engine_with(
            &source,
            &chunked_target,
            SyncConfig {
                chunk_size: 3,
                ..SyncConfig::default()
            },
        );
        let mut chunked = RunMetrics::new();
        engine
            .sync_table(StagingTable::Opportunity, &mut chunked)
            .await
            .unwrap();

        let wide_target = MemoryTarget::new();
        let engine = engine_with(&source, &wide_target, SyncConfig::default());
        let mut wide = RunMetrics::new();
        engine
            .sync_table(StagingTable::Opportunity, &mut wide)
            .await
            .unwrap();

        let entity = StagingTable::Opportunity.metric_entity();
        assert_eq!(chunked.get(&entity, Counter::ChunksApplied), 3);
        assert_eq!(wide.get(&entity, Counter::ChunksApplied), 1);
        assert_eq!(
            chunked_target.staging_rows(StagingTable::Opportunity).await,
            wide_target.staging_rows(StagingTable::Opportunity).await
        );
    }

    #[tokio::test]
    async fn test_excluded_columns_stay_null_through_updates() {
        let source = MemorySource::new();
        let target = MemoryTarget::new();
        let mut record = opportunity(1);
        record.modified_comments = Some("internal note".to_string());
        source
            .seed_record(
                StagingTable::Opportunity,
                LegacyKey::current(1),
                Some(ts(5)),
                &record,
            )
            .await
            .unwrap();

        let mut excluded = HashMap::new();
        excluded.insert(
            "opportunity".to_string(),
            vec!["modified_comments".to_string()],
        );
        let engine = engine_with(
            &source,
            &target,
            SyncConfig {
                excluded_columns: excluded,
                ..SyncConfig::default()
            },
        );

        let mut metrics = RunMetrics::new();
        engine
            .sync_table(StagingTable::Opportunity, &mut metrics)
            .await
            .unwrap();
        let row = target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(1))
            .await
            .unwrap();
        assert_eq!(row.payload.get("modified_comments"), Some(&Value::Null));
        assert_eq!(
            row.payload.get("opp_number"),
            Some(&Value::String("TEST-00001".to_string()))
        );

        // A newer source revision must not leak the excluded value either.
        record.modified_comments = Some("changed note".to_string());
        source
            .seed_record(
                StagingTable::Opportunity,
                LegacyKey::current(1),
                Some(ts(9)),
                &record,
            )
            .await
            .unwrap();
        engine
            .sync_table(StagingTable::Opportunity, &mut metrics)
            .await
            .unwrap();
        let row = target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(1))
            .await
            .unwrap();
        assert_eq!(row.payload.get("modified_comments"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_unknown_configured_table_is_a_configuration_error() {
        let engine = engine_with(
            &MemorySource::new(),
            &MemoryTarget::new(),
            SyncConfig {
                tables: vec!["opportunity".to_string(), "nonexistent".to_string()],
                ..SyncConfig::default()
            },
        );

        let err = engine.tables().unwrap_err();
        assert!(matches!(err, StrataError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_empty_table_list_means_all_tables() {
        let engine = engine_with(
            &MemorySource::new(),
            &MemoryTarget::new(),
            SyncConfig::default(),
        );

        assert_eq!(engine.tables().unwrap(), StagingTable::all().to_vec());
    }

    /// Source that lists one key more than it can fetch, like a row deleted
    /// between the listing query and the chunk fetch.
    struct VanishingSource {
        inner: MemorySource,
        phantom: KeyStamp,
    }

    #[async_trait]
    impl SourceStore for VanishingSource {
        async fn check_connection(&self) -> Result<()> {
            self.inner.check_connection().await
        }

        async fn key_listing(&self, table: StagingTable) -> Result<Vec<KeyStamp>> {
            let mut listing = self.inner.key_listing(table).await?;
            listing.push(self.phantom);
            Ok(listing)
        }

        async fn fetch_rows(
            &self,
            table: StagingTable,
            keys: &[LegacyKey],
        ) -> Result<Vec<SourceRow>> {
            self.inner.fetch_rows(table, keys).await
        }
    }

    #[tokio::test]
    async fn test_rows_vanished_between_listing_and_fetch_are_tolerated() {
        let inner = MemorySource::new();
        inner
            .seed_record(
                StagingTable::Opportunity,
                LegacyKey::current(1),
                Some(ts(5)),
                &opportunity(1),
            )
            .await
            .unwrap();
        let source = VanishingSource {
            inner,
            phantom: KeyStamp {
                key: LegacyKey::current(99),
                last_upd_date: Some(ts(5)),
            },
        };
        let target = MemoryTarget::new();

        let engine = SyncEngine::new(
            Arc::new(source),
            Arc::new(target.clone()),
            SyncConfig::default(),
        );
        let mut metrics = RunMetrics::new();
        engine
            .sync_table(StagingTable::Opportunity, &mut metrics)
            .await
            .unwrap();

        let entity = StagingTable::Opportunity.metric_entity();
        assert_eq!(metrics.get(&entity, Counter::Inserted), 1);
        assert!(target
            .staging_row(StagingTable::Opportunity, LegacyKey::current(99))
            .await
            .is_none());
    }
}
