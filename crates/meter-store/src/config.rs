//! Store configuration

use std::path::PathBuf;

use serde::Deserialize;

/// `[store]` section of the service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Disable to run without persistence
    pub enabled: bool,
    /// SQLite database file
    pub path: PathBuf,
    /// Whether `init` may create the database file
    pub create_if_missing: bool,
    /// How long a connection waits on a locked database (milliseconds)
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("water_meter.db"),
            create_if_missing: true,
            busy_timeout_ms: 5000,
        }
    }
}

impl StoreConfig {
    /// Config for a database at `path`, other fields defaulted
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}
