use std::str::FromStr;

use chrono::{DateTime, Utc};
use paywall_core::{
    store::{AccessStore, StoreError},
    types::{Grant, InvoiceId, ResourceId, SubjectId},
};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

/// Convert a SQLx error into the store error.
fn map_db_error(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn resource_key(resource_id: ResourceId) -> Result<i64, StoreError> {
    i64::try_from(resource_id.0)
        .map_err(|_| StoreError::Backend(format!("Resource id {resource_id} out of range")))
}

/// Grants persisted in a SQLite database, one row per grant.
///
/// Expiry is stored as unix milliseconds.
#[derive(Debug, Clone)]
pub struct SqliteAccessStore {
    pool: SqlitePool,
}

impl SqliteAccessStore {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and ensure the schema exists.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        if url.contains(":memory:") {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(map_db_error)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(map_db_error)?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// A private in-memory database. A single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(map_db_error)?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the grant table and its lookup index. Safe to run on every start.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(
            r"
            CREATE TABLE IF NOT EXISTS paywall_access (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id INTEGER NOT NULL,
                subject_id TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_paywall_access_lookup
                ON paywall_access (resource_id, subject_id);
            CREATE TABLE IF NOT EXISTS paywall_redeemed_invoices (
                invoice_id TEXT PRIMARY KEY,
                redeemed_at INTEGER NOT NULL
            );
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("paywall schema ready");

        Ok(())
    }

    /// Remove the paywall tables and everything in them.
    pub async fn drop_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(
            r"
            DROP TABLE IF EXISTS paywall_access;
            DROP TABLE IF EXISTS paywall_redeemed_invoices;
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        #[cfg(feature = "tracing")]
        tracing::info!("paywall tables dropped");

        Ok(())
    }
}

impl AccessStore for SqliteAccessStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, subject_id)))]
    async fn has_valid_access_at(
        &self,
        resource_id: ResourceId,
        subject_id: &SubjectId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, i64>(
            r"
            SELECT EXISTS(
                SELECT 1 FROM paywall_access
                WHERE resource_id = ? AND subject_id = ? AND expires_at > ?
            )
            ",
        )
        .bind(resource_key(resource_id)?)
        .bind(subject_id.as_str())
        .bind(at.timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(found != 0)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(resource_id = %grant.resource_id())))]
    async fn insert_grant(&self, grant: Grant) -> Result<(), StoreError> {
        if grant.subject_id().is_blank() {
            return Err(StoreError::MissingSubject);
        }

        sqlx::query(
            r"
            INSERT INTO paywall_access (resource_id, subject_id, expires_at)
            VALUES (?, ?, ?)
            ",
        )
        .bind(resource_key(grant.resource_id())?)
        .bind(grant.subject_id().as_str())
        .bind(grant.expires_at().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn redeem_invoice(
        &self,
        invoice_id: &InvoiceId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            INSERT INTO paywall_redeemed_invoices (invoice_id, redeemed_at)
            VALUES (?, ?)
            ON CONFLICT (invoice_id) DO NOTHING
            ",
        )
        .bind(invoice_id.as_str())
        .bind(at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn prune_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM paywall_access WHERE expires_at <= ?")
            .bind(before.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
