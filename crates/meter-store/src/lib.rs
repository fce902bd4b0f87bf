//! meter-store - SQLite-backed [`ReadingStore`](meter_core::ReadingStore)
//!
//! The schema is created once at startup by [`SqliteStore::init`]. Requests
//! then open their own short-lived connection through
//! [`ReadingStore::connect`](meter_core::ReadingStore::connect), which never
//! creates the database: a missing file means the store is unreachable.

pub mod config;
mod migrations;
mod sqlite;

pub use config::StoreConfig;
pub use sqlite::{SqliteConnection, SqliteStore};
