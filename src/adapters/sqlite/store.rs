//! Shared SQLite store backing the metric, action, and queue tables.
//!
//! One database file serves the whole control plane, and offline CLI
//! commands (`action`, `status`, `ingest`, `policy reload`) open it next to
//! a live daemon. WAL mode keeps those readers from stalling the daemon's
//! writers; the busy timeout absorbs worker bursts contending on queue pops
//! and action status updates, which all funnel through SQLite's single
//! writer.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::domain::models::DatabaseConfig;

/// Schema versions applied in order at open. Versions already recorded in
/// `schema_migrations` are skipped, so reopening an existing store is
/// idempotent.
const SCHEMA: &[(i64, &str)] = &[(1, include_str!("../../../migrations/001_initial_schema.sql"))];

/// Workers hold the write lock only for single-row pops and CAS updates,
/// so a blocked writer clears quickly; waiting beats surfacing SQLITE_BUSY
/// to a dispatch in flight.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid database path `{0}`")]
    InvalidPath(String),
    #[error("cannot create database directory: {0}")]
    CreateDirectory(#[source] std::io::Error),
    #[error("cannot open database: {0}")]
    Open(#[source] sqlx::Error),
    #[error("schema version {version} failed to apply: {source}")]
    Schema {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
}

/// Owns the connection pool and the embedded schema lifecycle: opening a
/// store always leaves it migrated.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) and migrate the store at `config.path`.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        ensure_parent_dir(&config.path)?;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))
            .map_err(|_| StoreError::InvalidPath(config.path.clone()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(StoreError::Open)?;

        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    /// Private in-memory store for tests. A single connection keeps the
    /// database alive for the pool's lifetime; the schema is applied the
    /// same way as for file stores.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|_| StoreError::InvalidPath(":memory:".to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StoreError::Open)?;

        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    /// Cheap handle to the underlying pool (pools are reference-counted).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Highest schema version recorded in this store.
    pub async fn schema_version(&self) -> Result<i64, StoreError> {
        let (version,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await
                .map_err(|source| StoreError::Schema { version: 0, source })?;
        Ok(version)
    }

    async fn apply_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|source| StoreError::Schema { version: 0, source })?;

        let current = self.schema_version().await?;
        let mut applied = 0;
        for (version, sql) in SCHEMA {
            if *version <= current {
                continue;
            }
            sqlx::raw_sql(sql)
                .execute(&self.pool)
                .await
                .map_err(|source| StoreError::Schema {
                    version: *version,
                    source,
                })?;
            sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
                .bind(*version)
                .execute(&self.pool)
                .await
                .map_err(|source| StoreError::Schema {
                    version: *version,
                    source,
                })?;
            applied += 1;
        }

        if applied > 0 {
            info!(applied, "database schema updated");
        }
        Ok(())
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), StoreError> {
    if path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(StoreError::CreateDirectory)?;
        }
    }
    Ok(())
}
