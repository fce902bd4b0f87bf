//! Upload configuration

use std::path::PathBuf;

use serde::Deserialize;

/// 16 MiB
pub const DEFAULT_MAX_BYTES: usize = 16 * 1024 * 1024;

/// `[upload]` section of the service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Staging directory for uploaded images
    pub dir: PathBuf,
    /// Maximum request body size in bytes
    pub max_bytes: usize,
    /// Accepted file extensions, compared case-insensitively
    pub allowed_extensions: Vec<String>,
    /// Keep staged images after inference
    pub retain_uploads: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            max_bytes: DEFAULT_MAX_BYTES,
            allowed_extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
            retain_uploads: true,
        }
    }
}

impl UploadConfig {
    /// Config staging into `dir`, other fields defaulted
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Create the staging directory if it does not exist yet
    pub fn create_staging_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }
}
