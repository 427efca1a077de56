//! PostgreSQL target store
//!
//! Owns the staging and domain schemas. Staging writes and transformation
//! batches are each applied in a single transaction, so a mid-batch
//! failure leaves every row of the batch pending and the domain untouched.

use crate::adapters::postgresql::client::PostgresClient;
use crate::adapters::postgresql::models;
use crate::adapters::store::order_and_truncate;
use crate::adapters::store::traits::{
    DomainWrite, FetchOrder, PendingInstruction, PendingLink, PendingOpportunity, PendingSummary,
    SourceRow, StagingKeyStamp, TableStatus, TargetStore, TransformBatch,
};
use crate::config::schema::TargetConfig;
use crate::domain::enums::LinkEntity;
use crate::domain::instruction::CompetitionInstruction;
use crate::domain::link::SummaryLink;
use crate::domain::opportunity::Opportunity;
use crate::domain::summary::OpportunitySummary;
use crate::domain::{Result, StrataError};
use crate::staging::key::LegacyKey;
use crate::staging::row::StagedRow;
use crate::staging::tables::StagingTable;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::{pin_mut, TryStreamExt};
use std::collections::HashMap;
use tokio_postgres::types::ToSql;
use uuid::Uuid;

const MIGRATION_SQL: &str = include_str!("../../../migrations/001_initial_schema.sql");

fn tx_err(e: tokio_postgres::Error) -> StrataError {
    StrataError::Storage(format!("Transaction failed: {e}"))
}

pub struct PostgresTarget {
    client: PostgresClient,
    staging_schema: String,
    domain_schema: String,
}

impl PostgresTarget {
    /// Connect a target store per the `[target]` configuration
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let client = PostgresClient::connect(
            &config.connection_string,
            config.max_connections,
            config.connect_timeout_seconds,
            config.statement_timeout_seconds,
        )
        .await?;
        Ok(Self {
            client,
            staging_schema: config.staging_schema.clone(),
            domain_schema: config.domain_schema.clone(),
        })
    }

    fn staging_table(&self, table: StagingTable) -> String {
        format!("{}.{}", self.staging_schema, table.as_str())
    }

    fn domain_table(&self, name: &str) -> String {
        format!("{}.{}", self.domain_schema, name)
    }

    /// Fetch pending staged rows from one table in the requested order
    async fn fetch_pending_staged(
        &self,
        table: StagingTable,
        limit: usize,
        order: FetchOrder,
    ) -> Result<Vec<StagedRow>> {
        let direction = match order {
            FetchOrder::NewestFirst => "DESC",
            FetchOrder::OldestFirst => "ASC",
        };
        let sql = format!(
            "SELECT legacy_id, revision_number, payload, last_upd_date, is_deleted, \
             deleted_at, transformed_at, transformation_notes \
             FROM {table} WHERE transformed_at IS NULL \
             ORDER BY last_upd_date {direction} NULLS LAST, legacy_id LIMIT $1",
            table = self.staging_table(table),
        );
        let limit = limit as i64;
        let rows = self.client.query(&sql, &[&limit]).await?;
        rows.iter()
            .map(|row| models::staged_row_from_row(table, row))
            .collect()
    }

    async fn opportunities_by_legacy(&self, ids: &[i64]) -> Result<HashMap<i64, Opportunity>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT * FROM {} WHERE legacy_opportunity_id = ANY($1)",
            self.domain_table("opportunity"),
        );
        let rows = self.client.query(&sql, &[&ids]).await?;
        let mut map = HashMap::with_capacity(rows.len());
        for row in &rows {
            let opportunity = models::opportunity_from_row(row)?;
            map.insert(opportunity.legacy_opportunity_id, opportunity);
        }
        Ok(map)
    }

    async fn summaries_by_legacy(
        &self,
        ids: &[i64],
    ) -> Result<HashMap<(i64, Option<i32>), OpportunitySummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT * FROM {} WHERE legacy_summary_id = ANY($1)",
            self.domain_table("opportunity_summary"),
        );
        let rows = self.client.query(&sql, &[&ids]).await?;
        let mut map = HashMap::with_capacity(rows.len());
        for row in &rows {
            let summary = models::summary_from_row(row)?;
            map.insert(
                (summary.legacy_summary_id, summary.revision_number),
                summary,
            );
        }
        Ok(map)
    }

    async fn links_by_summary(
        &self,
        summary_ids: &[Uuid],
        entity: LinkEntity,
    ) -> Result<HashMap<Uuid, Vec<SummaryLink>>> {
        if summary_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT * FROM {} WHERE summary_id = ANY($1) AND link_entity = $2",
            self.domain_table("summary_link"),
        );
        let rows = self.client.query(&sql, &[&summary_ids, &entity.as_str()]).await?;
        let mut map: HashMap<Uuid, Vec<SummaryLink>> = HashMap::new();
        for row in &rows {
            let link = models::link_from_row(row)?;
            map.entry(link.summary_id.as_uuid()).or_default().push(link);
        }
        Ok(map)
    }

    async fn instructions_by_competition(
        &self,
        ids: &[i64],
    ) -> Result<HashMap<i64, CompetitionInstruction>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT * FROM {} WHERE legacy_competition_id = ANY($1)",
            self.domain_table("competition_instruction"),
        );
        let rows = self.client.query(&sql, &[&ids]).await?;
        let mut map = HashMap::with_capacity(rows.len());
        for row in &rows {
            let instruction = models::instruction_from_row(row)?;
            map.insert(instruction.legacy_competition_id, instruction);
        }
        Ok(map)
    }
}

#[async_trait]
impl TargetStore for PostgresTarget {
    async fn check_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        let sql = MIGRATION_SQL
            .replace("{{staging_schema}}", &self.staging_schema)
            .replace("{{domain_schema}}", &self.domain_schema);
        self.client.batch_execute(&sql).await?;
        tracing::info!(
            staging_schema = %self.staging_schema,
            domain_schema = %self.domain_schema,
            "Target schema initialized"
        );
        Ok(())
    }

    async fn staging_key_listing(&self, table: StagingTable) -> Result<Vec<StagingKeyStamp>> {
        let sql = format!(
            "SELECT legacy_id, revision_number, last_upd_date, is_deleted FROM {}",
            self.staging_table(table),
        );
        let client = self.client.get_connection().await?;
        let stream = client
            .query_raw(&sql, Vec::<&(dyn ToSql + Sync)>::new())
            .await
            .map_err(|e| StrataError::Storage(format!("Staging key listing failed: {e}")))?;
        pin_mut!(stream);

        let mut stamps = Vec::new();
        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| StrataError::Storage(format!("Staging key listing stream failed: {e}")))?
        {
            let id: i64 = models::get(&row, "legacy_id")?;
            let revision: Option<i32> = models::get(&row, "revision_number")?;
            let last_upd_date: Option<NaiveDateTime> = models::get(&row, "last_upd_date")?;
            let is_deleted: bool = models::get(&row, "is_deleted")?;
            let key = match revision {
                Some(revision) => LegacyKey::historical(id, revision),
                None => LegacyKey::current(id),
            };
            stamps.push(StagingKeyStamp {
                key,
                last_upd_date,
                is_deleted,
            });
        }
        Ok(stamps)
    }

    async fn upsert_staging_rows(&self, table: StagingTable, rows: Vec<SourceRow>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let conflict = if table.is_historical() {
            "(legacy_id, revision_number)"
        } else {
            "(legacy_id)"
        };
        let sql = format!(
            "INSERT INTO {table} \
             (legacy_id, revision_number, payload, last_upd_date, \
              is_deleted, deleted_at, transformed_at, transformation_notes) \
             VALUES ($1, $2, $3, $4, FALSE, NULL, NULL, NULL) \
             ON CONFLICT {conflict} DO UPDATE SET \
                 payload = EXCLUDED.payload, \
                 last_upd_date = EXCLUDED.last_upd_date, \
                 is_deleted = FALSE, \
                 deleted_at = NULL, \
                 transformed_at = NULL, \
                 transformation_notes = NULL",
            table = self.staging_table(table),
        );

        let mut conn = self.client.get_connection().await?;
        let tx = conn.transaction().await.map_err(tx_err)?;
        let stmt = tx.prepare(&sql).await.map_err(tx_err)?;
        for row in rows {
            let payload = serde_json::Value::Object(row.payload);
            tx.execute(
                &stmt,
                &[&row.key.id, &row.key.revision, &payload, &row.last_upd_date],
            )
            .await
            .map_err(tx_err)?;
        }
        tx.commit().await.map_err(tx_err)
    }

    async fn mark_staging_deleted(
        &self,
        table: StagingTable,
        keys: &[LegacyKey],
        deleted_at: DateTime<Utc>,
    ) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "UPDATE {table} SET is_deleted = TRUE, deleted_at = $3, \
             transformed_at = NULL, transformation_notes = NULL \
             WHERE legacy_id = $1 AND revision_number IS NOT DISTINCT FROM $2",
            table = self.staging_table(table),
        );

        let mut conn = self.client.get_connection().await?;
        let tx = conn.transaction().await.map_err(tx_err)?;
        let stmt = tx.prepare(&sql).await.map_err(tx_err)?;
        for key in keys {
            tx.execute(&stmt, &[&key.id, &key.revision, &deleted_at])
                .await
                .map_err(tx_err)?;
        }
        tx.commit().await.map_err(tx_err)
    }

    async fn fetch_pending_opportunities(
        &self,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingOpportunity>> {
        let staged = self
            .fetch_pending_staged(StagingTable::Opportunity, batch_size, order)
            .await?;
        let ids: Vec<i64> = staged.iter().map(|row| row.key.id).collect();
        let existing = self.opportunities_by_legacy(&ids).await?;
        Ok(staged
            .into_iter()
            .map(|staged| PendingOpportunity {
                existing: existing.get(&staged.key.id).cloned(),
                staged,
            })
            .collect())
    }

    async fn fetch_pending_summaries(
        &self,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingSummary>> {
        let mut staged = self
            .fetch_pending_staged(StagingTable::Summary, batch_size, order)
            .await?;
        staged.extend(
            self.fetch_pending_staged(StagingTable::SummaryHist, batch_size, order)
                .await?,
        );
        let staged = order_and_truncate(staged, order, batch_size, |row| row.last_upd_date);

        let summary_ids: Vec<i64> = staged.iter().map(|row| row.key.id).collect();
        let parent_ids: Vec<i64> = staged
            .iter()
            .filter_map(|row| row.payload_i64("opportunity_id"))
            .collect();
        let existing = self.summaries_by_legacy(&summary_ids).await?;
        let parents = self.opportunities_by_legacy(&parent_ids).await?;

        Ok(staged
            .into_iter()
            .map(|staged| {
                let parent = staged
                    .payload_i64("opportunity_id")
                    .and_then(|id| parents.get(&id))
                    .map(|o| o.opportunity_id);
                PendingSummary {
                    existing: existing.get(&(staged.key.id, staged.key.revision)).cloned(),
                    parent,
                    staged,
                }
            })
            .collect())
    }

    async fn fetch_pending_links(
        &self,
        entity: LinkEntity,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingLink>> {
        let mut staged = Vec::new();
        for table in StagingTable::all()
            .iter()
            .copied()
            .filter(|t| t.link_entity() == Some(entity))
        {
            staged.extend(self.fetch_pending_staged(table, batch_size, order).await?);
        }
        let staged = order_and_truncate(staged, order, batch_size, |row| row.last_upd_date);

        let parent_legacy_ids: Vec<i64> = staged
            .iter()
            .filter_map(|row| row.payload_i64("summary_id"))
            .collect();
        let parents = self.summaries_by_legacy(&parent_legacy_ids).await?;

        let parent_uuids: Vec<Uuid> = parents.values().map(|s| s.summary_id.as_uuid()).collect();
        let siblings = self.links_by_summary(&parent_uuids, entity).await?;

        Ok(staged
            .into_iter()
            .map(|staged| {
                let parent = staged
                    .payload_i64("summary_id")
                    .and_then(|id| parents.get(&(id, staged.key.revision)))
                    .map(|s| s.summary_id);
                let existing = parent
                    .and_then(|p| siblings.get(&p.as_uuid()).cloned())
                    .unwrap_or_default();
                PendingLink {
                    existing,
                    parent,
                    staged,
                }
            })
            .collect())
    }

    async fn fetch_pending_instructions(
        &self,
        batch_size: usize,
        order: FetchOrder,
    ) -> Result<Vec<PendingInstruction>> {
        let staged = self
            .fetch_pending_staged(StagingTable::Instruction, batch_size, order)
            .await?;
        let competition_ids: Vec<i64> = staged
            .iter()
            .filter_map(|row| row.payload_i64("competition_id"))
            .collect();
        let existing = self.instructions_by_competition(&competition_ids).await?;
        Ok(staged
            .into_iter()
            .map(|staged| PendingInstruction {
                existing: staged
                    .payload_i64("competition_id")
                    .and_then(|id| existing.get(&id))
                    .cloned(),
                staged,
            })
            .collect())
    }

    async fn apply_transform_batch(&self, batch: TransformBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let upsert_opportunity = format!(
            "INSERT INTO {table} \
             (opportunity_id, legacy_opportunity_id, opportunity_number, opportunity_title, \
              agency_code, category, category_explanation, is_draft, revision_number, \
              modified_comments, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (opportunity_id) DO UPDATE SET \
                 legacy_opportunity_id = EXCLUDED.legacy_opportunity_id, \
                 opportunity_number = EXCLUDED.opportunity_number, \
                 opportunity_title = EXCLUDED.opportunity_title, \
                 agency_code = EXCLUDED.agency_code, \
                 category = EXCLUDED.category, \
                 category_explanation = EXCLUDED.category_explanation, \
                 is_draft = EXCLUDED.is_draft, \
                 revision_number = EXCLUDED.revision_number, \
                 modified_comments = EXCLUDED.modified_comments, \
                 updated_at = EXCLUDED.updated_at",
            table = self.domain_table("opportunity"),
        );
        let upsert_summary = format!(
            "INSERT INTO {table} \
             (summary_id, opportunity_id, legacy_summary_id, revision_number, \
              post_date, close_date, archive_date, expected_number_of_awards, \
              estimated_total_funding, award_ceiling, award_floor, is_cost_sharing, \
              summary_description, agency_contact_description, agency_email_address, \
              agency_email_description, agency_phone_number, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19) \
             ON CONFLICT (summary_id) DO UPDATE SET \
                 opportunity_id = EXCLUDED.opportunity_id, \
                 legacy_summary_id = EXCLUDED.legacy_summary_id, \
                 revision_number = EXCLUDED.revision_number, \
                 post_date = EXCLUDED.post_date, \
                 close_date = EXCLUDED.close_date, \
                 archive_date = EXCLUDED.archive_date, \
                 expected_number_of_awards = EXCLUDED.expected_number_of_awards, \
                 estimated_total_funding = EXCLUDED.estimated_total_funding, \
                 award_ceiling = EXCLUDED.award_ceiling, \
                 award_floor = EXCLUDED.award_floor, \
                 is_cost_sharing = EXCLUDED.is_cost_sharing, \
                 summary_description = EXCLUDED.summary_description, \
                 agency_contact_description = EXCLUDED.agency_contact_description, \
                 agency_email_address = EXCLUDED.agency_email_address, \
                 agency_email_description = EXCLUDED.agency_email_description, \
                 agency_phone_number = EXCLUDED.agency_phone_number, \
                 updated_at = EXCLUDED.updated_at",
            table = self.domain_table("opportunity_summary"),
        );
        let upsert_link = format!(
            "INSERT INTO {table} \
             (link_id, summary_id, legacy_link_id, link_entity, link_value, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (link_id) DO UPDATE SET \
                 summary_id = EXCLUDED.summary_id, \
                 legacy_link_id = EXCLUDED.legacy_link_id, \
                 link_entity = EXCLUDED.link_entity, \
                 link_value = EXCLUDED.link_value, \
                 updated_at = EXCLUDED.updated_at",
            table = self.domain_table("summary_link"),
        );
        let upsert_instruction = format!(
            "INSERT INTO {table} \
             (instruction_id, legacy_instruction_id, legacy_competition_id, file_name, \
              extension, storage_path, content_type, file_size_bytes, checksum_sha256, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (instruction_id) DO UPDATE SET \
                 legacy_instruction_id = EXCLUDED.legacy_instruction_id, \
                 legacy_competition_id = EXCLUDED.legacy_competition_id, \
                 file_name = EXCLUDED.file_name, \
                 extension = EXCLUDED.extension, \
                 storage_path = EXCLUDED.storage_path, \
                 content_type = EXCLUDED.content_type, \
                 file_size_bytes = EXCLUDED.file_size_bytes, \
                 checksum_sha256 = EXCLUDED.checksum_sha256, \
                 updated_at = EXCLUDED.updated_at",
            table = self.domain_table("competition_instruction"),
        );

        let mut conn = self.client.get_connection().await?;
        let tx = conn.transaction().await.map_err(tx_err)?;

        for write in batch.writes {
            match write {
                DomainWrite::UpsertOpportunity(o) => {
                    let id = o.opportunity_id.as_uuid();
                    let category = o.category.map(|c| c.as_str());
                    tx.execute(
                        &upsert_opportunity,
                        &[
                            &id,
                            &o.legacy_opportunity_id,
                            &o.opportunity_number,
                            &o.opportunity_title,
                            &o.agency_code,
                            &category,
                            &o.category_explanation,
                            &o.is_draft,
                            &o.revision_number,
                            &o.modified_comments,
                            &o.created_at,
                            &o.updated_at,
                        ],
                    )
                    .await
                    .map_err(tx_err)?;
                }
                DomainWrite::DeleteOpportunity(id) => {
                    let sql = format!(
                        "DELETE FROM {} WHERE opportunity_id = $1",
                        self.domain_table("opportunity"),
                    );
                    let id = id.as_uuid();
                    tx.execute(&sql, &[&id]).await.map_err(tx_err)?;
                }
                DomainWrite::UpsertSummary(s) => {
                    let id = s.summary_id.as_uuid();
                    let parent = s.opportunity_id.as_uuid();
                    tx.execute(
                        &upsert_summary,
                        &[
                            &id,
                            &parent,
                            &s.legacy_summary_id,
                            &s.revision_number,
                            &s.post_date,
                            &s.close_date,
                            &s.archive_date,
                            &s.expected_number_of_awards,
                            &s.estimated_total_funding,
                            &s.award_ceiling,
                            &s.award_floor,
                            &s.is_cost_sharing,
                            &s.summary_description,
                            &s.agency_contact_description,
                            &s.agency_email_address,
                            &s.agency_email_description,
                            &s.agency_phone_number,
                            &s.created_at,
                            &s.updated_at,
                        ],
                    )
                    .await
                    .map_err(tx_err)?;
                }
                DomainWrite::DeleteSummary(id) => {
                    let sql = format!(
                        "DELETE FROM {} WHERE summary_id = $1",
                        self.domain_table("opportunity_summary"),
                    );
                    let id = id.as_uuid();
                    tx.execute(&sql, &[&id]).await.map_err(tx_err)?;
                }
                DomainWrite::UpsertLink(l) => {
                    let id = l.link_id.as_uuid();
                    let parent = l.summary_id.as_uuid();
                    tx.execute(
                        &upsert_link,
                        &[
                            &id,
                            &parent,
                            &l.legacy_link_id,
                            &l.value.entity().as_str(),
                            &l.value.as_str(),
                            &l.created_at,
                            &l.updated_at,
                        ],
                    )
                    .await
                    .map_err(tx_err)?;
                }
                DomainWrite::DeleteLink(id) => {
                    let sql = format!(
                        "DELETE FROM {} WHERE link_id = $1",
                        self.domain_table("summary_link"),
                    );
                    let id = id.as_uuid();
                    tx.execute(&sql, &[&id]).await.map_err(tx_err)?;
                }
                DomainWrite::UpsertInstruction(i) => {
                    let id = i.instruction_id.as_uuid();
                    tx.execute(
                        &upsert_instruction,
                        &[
                            &id,
                            &i.legacy_instruction_id,
                            &i.legacy_competition_id,
                            &i.file_name,
                            &i.extension,
                            &i.storage_path,
                            &i.content_type,
                            &i.file_size_bytes,
                            &i.checksum_sha256,
                            &i.created_at,
                            &i.updated_at,
                        ],
                    )
                    .await
                    .map_err(tx_err)?;
                }
                DomainWrite::DeleteInstruction(id) => {
                    let sql = format!(
                        "DELETE FROM {} WHERE instruction_id = $1",
                        self.domain_table("competition_instruction"),
                    );
                    let id = id.as_uuid();
                    tx.execute(&sql, &[&id]).await.map_err(tx_err)?;
                }
            }
        }

        for mark in batch.marks {
            let sql = format!(
                "UPDATE {table} SET transformed_at = $3, transformation_notes = $4 \
                 WHERE legacy_id = $1 AND revision_number IS NOT DISTINCT FROM $2",
                table = self.staging_table(mark.table),
            );
            let notes = mark.skip.map(|s| s.as_str());
            tx.execute(
                &sql,
                &[&mark.key.id, &mark.key.revision, &mark.transformed_at, &notes],
            )
            .await
            .map_err(tx_err)?;
        }

        tx.commit().await.map_err(tx_err)
    }

    async fn staging_status(&self) -> Result<Vec<TableStatus>> {
        let mut statuses = Vec::with_capacity(StagingTable::all().len());
        for table in StagingTable::all() {
            let sql = format!(
                "SELECT COUNT(*) AS total_rows, \
                 COUNT(*) FILTER (WHERE transformed_at IS NULL) AS pending_rows, \
                 COUNT(*) FILTER (WHERE is_deleted) AS deleted_rows \
                 FROM {}",
                self.staging_table(table),
            );
            let rows = self.client.query(&sql, &[]).await?;
            let row = rows.first().ok_or_else(|| {
                StrataError::Storage(format!("Status query for {table} returned no rows"))
            })?;
            let total: i64 = models::get(row, "total_rows")?;
            let pending: i64 = models::get(row, "pending_rows")?;
            let deleted: i64 = models::get(row, "deleted_rows")?;
            statuses.push(TableStatus {
                table,
                total_rows: total as u64,
                pending_rows: pending as u64,
                deleted_rows: deleted as u64,
            });
        }
        Ok(statuses)
    }
}
