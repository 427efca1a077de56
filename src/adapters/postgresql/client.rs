//! PostgreSQL connection handling
//!
//! This module provides the pooled client both PostgreSQL store adapters
//! are built on.

use crate::config::{redacted_endpoint, SecretString};
use crate::domain::{Result, StrataError};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// Pooled PostgreSQL client
///
/// Wraps a `deadpool-postgres` pool and applies the configured statement
/// timeout to every checked-out connection.
pub struct PostgresClient {
    pool: Pool,
    statement_timeout_seconds: u64,
}

impl PostgresClient {
    /// Create a client with a fresh connection pool
    ///
    /// # Arguments
    ///
    /// * `connection_string` - `postgresql://` connection string
    /// * `max_connections` - Pool size cap
    /// * `connect_timeout_seconds` - Pool wait/create/recycle timeout
    /// * `statement_timeout_seconds` - Per-connection statement timeout, 0 to disable
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the pool
    /// cannot be built. The first connection is only opened on use.
    pub async fn connect(
        connection_string: &SecretString,
        max_connections: usize,
        connect_timeout_seconds: u64,
        statement_timeout_seconds: u64,
    ) -> Result<Self> {
        let pg_config: tokio_postgres::Config = connection_string
            .expose_secret()
            .as_ref()
            .parse()
            .map_err(|e| {
                StrataError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Duration::from_secs(connect_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| StrataError::Storage(format!("Failed to create connection pool: {e}")))?;

        tracing::info!(
            endpoint = %redacted_endpoint(connection_string),
            max_connections,
            "PostgreSQL pool configured"
        );

        Ok(Self {
            pool,
            statement_timeout_seconds,
        })
    }

    /// Get a connection from the pool with the statement timeout applied
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be obtained.
    pub async fn get_connection(&self) -> Result<Object> {
        let client = self.pool.get().await.map_err(|e| {
            StrataError::Connection(format!("Failed to get connection from pool: {e}"))
        })?;

        if self.statement_timeout_seconds > 0 {
            let timeout_query = format!(
                "SET statement_timeout = {}",
                self.statement_timeout_seconds * 1000
            );
            client.execute(&timeout_query, &[]).await.map_err(|e| {
                StrataError::Storage(format!("Failed to set statement timeout: {e}"))
            })?;
        }

        Ok(client)
    }

    /// Test the connection with a trivial query
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| StrataError::Connection(format!("Connection test failed: {e}")))?;
        tracing::debug!("PostgreSQL connection test successful");
        Ok(())
    }

    /// Execute a query and return rows
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn query(
        &self,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        client
            .query(statement, params)
            .await
            .map_err(|e| StrataError::Storage(format!("Query failed: {e}")))
    }

    /// Execute a statement and return the number of affected rows
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub async fn execute(
        &self,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64> {
        let client = self.get_connection().await?;
        client
            .execute(statement, params)
            .await
            .map_err(|e| StrataError::Storage(format!("Statement execution failed: {e}")))
    }

    /// Execute a batch of statements, e.g. a schema migration
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub async fn batch_execute(&self, statements: &str) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .batch_execute(statements)
            .await
            .map_err(|e| StrataError::Storage(format!("Batch execution failed: {e}")))
    }
}
