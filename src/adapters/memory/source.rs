//! In-memory source store

use crate::adapters::store::traits::{KeyStamp, SourceRow, SourceStore};
use crate::domain::Result;
use crate::staging::key::LegacyKey;
use crate::staging::tables::StagingTable;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Source store backed by maps, seedable from typed legacy records
///
/// Stands in for the legacy database in tests and rehearsal runs. Rows
/// can be removed between sync runs to exercise the delete sweep.
#[derive(Clone, Default)]
pub struct MemorySource {
    tables: Arc<Mutex<BTreeMap<StagingTable, BTreeMap<LegacyKey, SourceRow>>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one pre-built source row
    pub async fn seed(&self, table: StagingTable, row: SourceRow) {
        self.tables
            .lock()
            .await
            .entry(table)
            .or_default()
            .insert(row.key, row);
    }

    /// Seed one typed legacy record, serialized into its row payload
    pub async fn seed_record<T: Serialize>(
        &self,
        table: StagingTable,
        key: LegacyKey,
        last_upd_date: Option<NaiveDateTime>,
        record: &T,
    ) -> Result<()> {
        let row = SourceRow::from_record(key, last_upd_date, record)?;
        self.seed(table, row).await;
        Ok(())
    }

    /// Remove one row, simulating a hard delete in the legacy system
    pub async fn remove(&self, table: StagingTable, key: LegacyKey) {
        if let Some(rows) = self.tables.lock().await.get_mut(&table) {
            rows.remove(&key);
        }
    }

    pub async fn row_count(&self, table: StagingTable) -> usize {
        self.tables
            .lock()
            .await
            .get(&table)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn key_listing(&self, table: StagingTable) -> Result<Vec<KeyStamp>> {
        let tables = self.tables.lock().await;
        let stamps = tables
            .get(&table)
            .map(|rows| {
                rows.values()
                    .map(|row| KeyStamp {
                        key: row.key,
                        last_upd_date: row.last_upd_date,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(stamps)
    }

    async fn fetch_rows(&self, table: StagingTable, keys: &[LegacyKey]) -> Result<Vec<SourceRow>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .get(&table)
            .map(|rows| {
                keys.iter()
                    .filter_map(|key| rows.get(key).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::records::LegacyOpportunity;

    fn opportunity(id: i64) -> LegacyOpportunity {
        LegacyOpportunity {
            opportunity_id: id,
            opp_number: Some(format!("TEST-{id}")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_seed_and_list() {
        let source = MemorySource::new();
        source
            .seed_record(
                StagingTable::Opportunity,
                LegacyKey::current(7),
                None,
                &opportunity(7),
            )
            .await
            .unwrap();

        let stamps = source.key_listing(StagingTable::Opportunity).await.unwrap();
        assert_eq!(stamps.len(), 1);
        assert_eq!(stamps[0].key, LegacyKey::current(7));
    }

    #[tokio::test]
    async fn test_fetch_skips_missing_keys() {
        let source = MemorySource::new();
        source
            .seed_record(
                StagingTable::Opportunity,
                LegacyKey::current(1),
                None,
                &opportunity(1),
            )
            .await
            .unwrap();

        let rows = source
            .fetch_rows(
                StagingTable::Opportunity,
                &[LegacyKey::current(1), LegacyKey::current(2)],
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, LegacyKey::current(1));
    }

    #[tokio::test]
    async fn test_remove_simulates_hard_delete() {
        let source = MemorySource::new();
        source
            .seed_record(
                StagingTable::Opportunity,
                LegacyKey::current(1),
                None,
                &opportunity(1),
            )
            .await
            .unwrap();
        source.remove(StagingTable::Opportunity, LegacyKey::current(1)).await;

        assert_eq!(source.row_count(StagingTable::Opportunity).await, 0);
    }
}
