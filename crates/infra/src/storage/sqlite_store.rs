//! SQLite-backed snapshot store
//!
//! One table, one row per cache key:
//!
//! ```sql
//! snapshots(key TEXT PRIMARY KEY, value TEXT NOT NULL, updated_at INTEGER NOT NULL)
//! ```
//!
//! `value` is the serialized snapshot produced by the stale snapshot cache;
//! this store never looks inside it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clubhouse_common::resilience::{SnapshotStore, StoreError, StoreResult};
use clubhouse_domain::{ClubhouseError, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use crate::errors::InfraError;

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS snapshots (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);";

const POOL_SIZE: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// [`SnapshotStore`] on a pooled SQLite database
pub struct SqliteSnapshotStore {
    pool: Pool<SqliteConnectionManager>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSnapshotStore").field("path", &self.path).finish_non_exhaustive()
    }
}

impl SqliteSnapshotStore {
    /// Open (or create) the database file and ensure the schema exists
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns `ClubhouseError::Storage` if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClubhouseError::Storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let manager = SqliteConnectionManager::file(&path)
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let store = Self::with_manager(manager, POOL_SIZE, Some(path))?;
        info!(db_path = ?store.path, "snapshot store opened");
        Ok(store)
    }

    /// Private in-memory database, mainly for tests
    ///
    /// # Errors
    ///
    /// Returns `ClubhouseError::Storage` if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        // Every in-memory connection is its own database, so the pool holds one.
        Self::with_manager(SqliteConnectionManager::memory(), 1, None)
    }

    fn with_manager(
        manager: SqliteConnectionManager,
        pool_size: u32,
        path: Option<PathBuf>,
    ) -> Result<Self> {
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|err| ClubhouseError::from(InfraError::from(err)))?;
        let store = Self { pool, path };
        store.run_migrations()?;
        Ok(store)
    }

    /// Ensure the schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.pool.get().map_err(|err| ClubhouseError::from(InfraError::from(err)))?;
        conn.execute_batch(SCHEMA_SQL).map_err(|err| ClubhouseError::from(InfraError::from(err)))
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored snapshots
    pub fn len(&self) -> StoreResult<usize> {
        let conn = self.connection()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))
            .map_err(store_error)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn connection(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|err| StoreError::from(InfraError::from(err)))
    }
}

fn store_error(err: rusqlite::Error) -> StoreError {
    StoreError::from(InfraError::from(err))
}

impl SnapshotStore for SqliteSnapshotStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.connection()?;
        conn.query_row("SELECT value FROM snapshots WHERE key = ?1", params![key], |row| {
            row.get::<_, String>(0)
        })
        .optional()
        .map_err(store_error)
    }

    fn set(&self, key: &str, value: String) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO snapshots (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().timestamp_millis()],
        )
        .map_err(store_error)?;
        debug!(key, "snapshot persisted");
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        let conn = self.connection()?;
        let removed = conn
            .execute("DELETE FROM snapshots WHERE key = ?1", params![key])
            .map_err(store_error)?;
        Ok(removed > 0)
    }

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT key FROM snapshots WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
            )
            .map_err(store_error)?;
        let keys = stmt
            .query_map(params![prefix], |row| row.get::<_, String>(0))
            .map_err(store_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_error)?;
        Ok(keys)
    }
}
