//! SQLite connection registry implementation.
//!
//! Implements `ConnectionRepository` from `relayguard-core` using sqlx with
//! split read/write pools. Each upsert is a single atomic
//! `INSERT ... ON CONFLICT(connection_id) DO UPDATE`, preserving
//! `created_at` and refreshing `updated_at`. Deactivation is a soft delete;
//! rows survive for audit and statistics, and every lookup filters on the
//! active flag.

use chrono::{DateTime, Utc};
use sqlx::Row;

use relayguard_core::repository::ConnectionRepository;
use relayguard_types::connection::{ConnectionRecord, ConnectionUpsert, RegistryStats};
use relayguard_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConnectionRepository`.
pub struct SqliteConnectionRepository {
    pool: DatabasePool,
}

impl SqliteConnectionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain records.
struct ConnectionRow {
    connection_id: String,
    owner_user_id: i64,
    owner_name: Option<String>,
    owner_username: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl ConnectionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            connection_id: row.try_get("connection_id")?,
            owner_user_id: row.try_get("owner_user_id")?,
            owner_name: row.try_get("owner_name")?,
            owner_username: row.try_get("owner_username")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_record(self) -> Result<ConnectionRecord, RepositoryError> {
        Ok(ConnectionRecord {
            connection_id: self.connection_id,
            owner_user_id: self.owner_user_id,
            owner_name: self.owner_name,
            owner_username: self.owner_username,
            is_active: self.is_active,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl ConnectionRepository for SqliteConnectionRepository {
    async fn upsert(&self, params: &ConnectionUpsert) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());

        sqlx::query(
            r#"INSERT INTO business_connections
               (connection_id, owner_user_id, owner_name, owner_username, is_active, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(connection_id) DO UPDATE SET
                   owner_user_id = excluded.owner_user_id,
                   owner_name = excluded.owner_name,
                   owner_username = excluded.owner_username,
                   is_active = excluded.is_active,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&params.connection_id)
        .bind(params.owner_user_id)
        .bind(&params.owner_name)
        .bind(&params.owner_username)
        .bind(params.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, connection_id: &str) -> Result<Option<ConnectionRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM business_connections WHERE connection_id = ?")
            .bind(connection_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let conn_row = ConnectionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(conn_row.into_record()?))
            }
            None => Ok(None),
        }
    }

    async fn active_owner(&self, connection_id: &str) -> Result<Option<i64>, RepositoryError> {
        let row = sqlx::query(
            "SELECT owner_user_id FROM business_connections WHERE connection_id = ? AND is_active = 1",
        )
        .bind(connection_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let owner: i64 = row
                    .try_get("owner_user_id")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(owner))
            }
            None => Ok(None),
        }
    }

    async fn deactivate(&self, connection_id: &str) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());

        // Affecting zero rows is fine: deactivation is idempotent and an
        // unknown id is a successful no-op.
        sqlx::query(
            "UPDATE business_connections SET is_active = 0, updated_at = ? WHERE connection_id = ?",
        )
        .bind(&now)
        .bind(connection_id)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<ConnectionRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM business_connections WHERE is_active = 1 ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let conn_row =
                ConnectionRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            records.push(conn_row.into_record()?);
        }

        Ok(records)
    }

    async fn stats(&self) -> Result<RegistryStats, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT
                   COUNT(*) AS total_count,
                   COALESCE(SUM(is_active), 0) AS active_count,
                   MAX(updated_at) AS last_update
               FROM business_connections"#,
        )
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let total_count: i64 = row
            .try_get("total_count")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let active_count: i64 = row
            .try_get("active_count")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let last_update: Option<String> = row
            .try_get("last_update")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let last_update = last_update.as_deref().map(parse_datetime).transpose()?;

        let storage_size_bytes: i64 = sqlx::query_scalar(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
        )
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(RegistryStats {
            active_count,
            total_count,
            last_update,
            storage_size_bytes,
        })
    }
}
