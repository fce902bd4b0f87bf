//! SQLite implementation of the reading store

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OpenFlags};

use meter_core::{ReadingRecord, ReadingStore, StoreConnection, StoreError, StoreResult};

use crate::config::StoreConfig;
use crate::migrations::run_migrations;

/// Reading store backed by a single SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    config: Arc<StoreConfig>,
}

impl SqliteStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Create the database (if allowed) and apply schema migrations
    pub fn init(&self) -> StoreResult<()> {
        let path = &self.config.path;

        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.config.create_if_missing {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!(
                        "failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let mut conn = Connection::open_with_flags(path, flags).map_err(|e| {
            StoreError::Unavailable(format!("failed to open {}: {}", path.display(), e))
        })?;

        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            tracing::warn!(error = %e, "Failed to enable WAL mode");
        }

        run_migrations(&mut conn)?;

        tracing::info!(path = %path.display(), "Reading store initialized");
        Ok(())
    }

    /// Most recent rows first, at most `limit` of them
    pub fn recent(&self, limit: usize) -> StoreResult<Vec<ReadingRecord>> {
        let conn = open_existing(&self.config)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn
            .prepare(
                "SELECT id, reading, timestamp
                 FROM readings
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(ReadingRecord {
                    id: row.get(0)?,
                    reading: row.get(1)?,
                    timestamp: row.get(2)?,
                })
            })
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }
}

#[async_trait]
impl ReadingStore for SqliteStore {
    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        let config = self.config.clone();
        let conn = tokio::task::spawn_blocking(move || open_existing(&config))
            .await
            .map_err(|e| StoreError::Internal(format!("connect task failed: {}", e)))??;

        tracing::debug!(path = %self.config.path.display(), "Store connection opened");
        Ok(Box::new(SqliteConnection { conn: Some(conn) }))
    }
}

/// One request-scoped SQLite connection
///
/// The connection is moved onto the blocking pool for every statement and
/// handed back afterwards. Dropping it closes the underlying handle.
pub struct SqliteConnection {
    conn: Option<Connection>,
}

impl SqliteConnection {
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }
}

#[async_trait]
impl StoreConnection for SqliteConnection {
    async fn insert_reading(&mut self, reading: &str, timestamp: NaiveDateTime) -> StoreResult<()> {
        let conn = self.conn.take().ok_or(StoreError::Closed)?;
        let reading = reading.to_string();

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = conn.execute(
                "INSERT INTO readings (reading, timestamp) VALUES (?1, ?2)",
                params![reading, timestamp],
            );
            (conn, result)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("insert task failed: {}", e)))?;

        self.conn = Some(conn);
        result.map(|_| ()).map_err(query_error)
    }

    async fn close(mut self: Box<Self>) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        let closed = tokio::task::spawn_blocking(move || conn.close()).await;
        match closed {
            Ok(Ok(())) => tracing::debug!("Store connection closed"),
            // The handle is dropped along with the error, which releases it
            Ok(Err((_, e))) => tracing::warn!(error = %e, "Error while closing store connection"),
            Err(e) => tracing::warn!(error = %e, "Close task failed"),
        }
    }
}

fn open_existing(config: &StoreConfig) -> StoreResult<Connection> {
    let path = &config.path;
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| StoreError::Unavailable(format!("failed to open {}: {}", path.display(), e)))?;

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(query_error)?;

    Ok(conn)
}

fn query_error(err: rusqlite::Error) -> StoreError {
    StoreError::Query(err.to_string())
}
