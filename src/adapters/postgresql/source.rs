//! PostgreSQL source store
//!
//! Reads the foreign legacy schema. Key listings are streamed off the
//! connection so a full-table projection never holds more than the narrow
//! key/stamp columns in memory; full rows are fetched per chunk with their
//! mirrored columns folded into a JSON payload document.

use crate::adapters::postgresql::client::PostgresClient;
use crate::adapters::postgresql::models;
use crate::adapters::store::traits::{KeyStamp, SourceRow, SourceStore};
use crate::config::schema::SourceConfig;
use crate::domain::{Result, StrataError};
use crate::staging::key::LegacyKey;
use crate::staging::tables::StagingTable;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::{pin_mut, TryStreamExt};
use std::collections::HashSet;
use tokio_postgres::types::ToSql;

/// Remap storage-flavored errors to the source side of the taxonomy
fn source_err(e: StrataError) -> StrataError {
    match e {
        StrataError::Storage(message) => StrataError::Source(message),
        other => other,
    }
}

pub struct PostgresSource {
    client: PostgresClient,
    schema: String,
}

impl PostgresSource {
    /// Connect a source store per the `[source]` configuration
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let client = PostgresClient::connect(
            &config.connection_string,
            config.max_connections,
            config.connect_timeout_seconds,
            config.statement_timeout_seconds,
        )
        .await?;
        Ok(Self {
            client,
            schema: config.schema.clone(),
        })
    }

    fn qualified(&self, table: StagingTable) -> String {
        format!("{}.{}", self.schema, table.as_str())
    }
}

#[async_trait]
impl SourceStore for PostgresSource {
    async fn check_connection(&self) -> Result<()> {
        self.client.test_connection().await.map_err(source_err)
    }

    async fn key_listing(&self, table: StagingTable) -> Result<Vec<KeyStamp>> {
        let sql = if table.is_historical() {
            format!(
                "SELECT {pk} AS id, revision_number, last_upd_date FROM {table}",
                pk = table.source_key_column(),
                table = self.qualified(table),
            )
        } else {
            format!(
                "SELECT {pk} AS id, NULL::integer AS revision_number, last_upd_date FROM {table}",
                pk = table.source_key_column(),
                table = self.qualified(table),
            )
        };

        let client = self.client.get_connection().await.map_err(source_err)?;
        let stream = client
            .query_raw(&sql, Vec::<&(dyn ToSql + Sync)>::new())
            .await
            .map_err(|e| StrataError::Source(format!("Key listing query failed: {e}")))?;
        pin_mut!(stream);

        let mut stamps = Vec::new();
        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| StrataError::Source(format!("Key listing stream failed: {e}")))?
        {
            let id: i64 = models::get(&row, "id").map_err(source_err)?;
            let revision: Option<i32> = models::get(&row, "revision_number").map_err(source_err)?;
            let last_upd_date: Option<NaiveDateTime> =
                models::get(&row, "last_upd_date").map_err(source_err)?;
            let key = match revision {
                Some(revision) => LegacyKey::historical(id, revision),
                None => LegacyKey::current(id),
            };
            stamps.push(KeyStamp { key, last_upd_date });
        }

        tracing::debug!(
            table = %table,
            keys = stamps.len(),
            "Listed source keys"
        );
        Ok(stamps)
    }

    async fn fetch_rows(&self, table: StagingTable, keys: &[LegacyKey]) -> Result<Vec<SourceRow>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<i64> = keys.iter().map(|k| k.id).collect();
        ids.sort_unstable();
        ids.dedup();

        let revision_expr = if table.is_historical() {
            "revision_number"
        } else {
            "NULL::integer"
        };
        let sql = format!(
            "SELECT {pk} AS id, {revision_expr} AS revision_number, last_upd_date, \
             to_jsonb(t) AS payload FROM {table} t WHERE {pk} = ANY($1) ORDER BY {pk}",
            pk = table.source_key_column(),
            table = self.qualified(table),
        );

        let requested: HashSet<LegacyKey> = keys.iter().copied().collect();
        let fetched = self.client.query(&sql, &[&ids]).await.map_err(source_err)?;

        let mut rows = Vec::with_capacity(keys.len());
        for row in &fetched {
            let id: i64 = models::get(row, "id").map_err(source_err)?;
            let revision: Option<i32> = models::get(row, "revision_number").map_err(source_err)?;
            let key = match revision {
                Some(revision) => LegacyKey::historical(id, revision),
                None => LegacyKey::current(id),
            };
            // Unrequested revisions of a requested id come back too; drop them
            if !requested.contains(&key) {
                continue;
            }
            let last_upd_date: Option<NaiveDateTime> =
                models::get(row, "last_upd_date").map_err(source_err)?;
            let payload: serde_json::Value = models::get(row, "payload").map_err(source_err)?;
            let payload = match payload {
                serde_json::Value::Object(map) => map,
                other => {
                    return Err(StrataError::Source(format!(
                        "Row payload for {table}/{key} is not a JSON object: {other}"
                    )))
                }
            };
            rows.push(SourceRow {
                key,
                last_upd_date,
                payload,
            });
        }
        Ok(rows)
    }
}
