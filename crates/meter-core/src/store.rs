//! ReadingStore trait - best-effort persistence of decoded readings

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::StoreResult;

/// A relational store accepting `(reading, timestamp)` rows
///
/// The upload handler opens one connection per request and treats a failed
/// [`connect`](ReadingStore::connect) as "store unavailable": the request
/// still succeeds, just without persistence.
#[async_trait]
pub trait ReadingStore: Send + Sync + 'static {
    /// Open a fresh connection for the current request
    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>>;
}

/// A single open connection to a [`ReadingStore`]
#[async_trait]
pub trait StoreConnection: Send {
    /// Insert one reading with the given timestamp
    async fn insert_reading(&mut self, reading: &str, timestamp: NaiveDateTime) -> StoreResult<()>;

    /// Release the connection
    ///
    /// Errors while closing are logged by the implementation; the connection
    /// is gone either way.
    async fn close(self: Box<Self>);
}
