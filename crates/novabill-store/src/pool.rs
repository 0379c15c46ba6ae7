//! # Connection Pool Setup
//!
//! Builds the SQLite pool with the pragmas the engine needs: WAL for
//! concurrent readers during commits, foreign keys on, and a busy timeout
//! so short lock contention waits instead of failing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use novabill_engine::{StoreError, StoreResult};

/// Pool configuration, builder style.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file path. `None` runs fully in memory (tests, demos).
    path: Option<PathBuf>,
    max_connections: u32,
    busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: None,
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// In-memory database (nothing survives the process).
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed database at the given path.
    pub fn at_path(path: impl AsRef<Path>) -> Self {
        StoreConfig {
            path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }
}

/// Opens the pool and applies pending migrations.
pub(crate) async fn connect(config: &StoreConfig) -> StoreResult<SqlitePool> {
    let options = match &config.path {
        Some(path) => SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal),
        // Memory journal: WAL needs a file.
        None => SqliteConnectOptions::new()
            .in_memory(true)
            .journal_mode(SqliteJournalMode::Memory),
    }
    .foreign_keys(true)
    .busy_timeout(config.busy_timeout);

    // An in-memory database exists per connection; a pool larger than one
    // would hand out empty databases.
    let max_connections = if config.is_in_memory() {
        1
    } else {
        config.max_connections
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

    crate::migrations::MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;

    info!(
        in_memory = config.is_in_memory(),
        max_connections, "sqlite pool ready"
    );
    Ok(pool)
}
