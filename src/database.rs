//! Persistence of discovered proxies
//!
//! The reconciler talks to storage only through [`Store`]. Identity is
//! `(address, dial_type)`; the SQLite adapter backs it with a unique index so
//! that two providers reporting the same new proxy in the same tick cannot
//! produce two rows.

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::proxy::models::{DialType, ProviderKind, ProxyRecord};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Refresh `updated_at` and reset the error count of an existing row.
    /// Returns whether a row matched.
    async fn touch(&self, address: &str, dial_type: DialType, now: i64)
        -> Result<bool, StoreError>;

    /// Insert a first-seen record
    async fn insert(&self, record: &ProxyRecord) -> Result<(), StoreError>;
}

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS proxies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL,
    dial_type TEXT NOT NULL,
    provider TEXT NOT NULL,
    err_times INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (address, dial_type)
)
"#;

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the pool and make sure the schema exists
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(config.max_lifetime())
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM proxies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get(
        &self,
        address: &str,
        dial_type: DialType,
    ) -> Result<Option<ProxyRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT address, dial_type, provider, err_times, created_at, updated_at \
             FROM proxies WHERE address = ? AND dial_type = ?",
        )
        .bind(address)
        .bind(dial_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let dial_type: String = row.try_get("dial_type")?;
        let provider: String = row.try_get("provider")?;
        Ok(Some(ProxyRecord {
            address: row.try_get("address")?,
            dial_type: dial_type.parse().map_err(StoreError::Corrupt)?,
            provider: provider
                .parse::<ProviderKind>()
                .map_err(|p| StoreError::Corrupt(format!("unknown provider {p}")))?,
            error_count: row.try_get("err_times")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn touch(
        &self,
        address: &str,
        dial_type: DialType,
        now: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE proxies SET updated_at = ?, err_times = 0 \
             WHERE address = ? AND dial_type = ?",
        )
        .bind(now)
        .bind(address)
        .bind(dial_type.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert(&self, record: &ProxyRecord) -> Result<(), StoreError> {
        // A concurrent first sighting lands here as a touch.
        sqlx::query(
            "INSERT INTO proxies (address, dial_type, provider, err_times, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (address, dial_type) \
             DO UPDATE SET updated_at = excluded.updated_at, err_times = 0",
        )
        .bind(record.address.as_str())
        .bind(record.dial_type.as_str())
        .bind(record.provider.as_str())
        .bind(record.error_count)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
