//! Upload validation and staging
//!
//! Filenames are checked against the allowed extensions as sent by the
//! client, then sanitized before being joined onto the staging directory.
//! Sanitized names are not made unique: a second upload with the same name
//! replaces the first.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Reasons an upload is refused before anything touches the disk
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    /// No file part named `image`
    #[error("No image provided")]
    MissingFile,
    /// File part with an empty filename
    #[error("No selected file")]
    EmptyFilename,
    /// Extension outside the allowed set
    #[error("File type not allowed")]
    UnsupportedType,
}

/// Whether `file_name` ends in one of `allowed` (case-insensitive)
pub fn allowed_file(file_name: &str, allowed: &[String]) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_lowercase();
            allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

/// Reduce a client-supplied filename to a safe single path component
///
/// Non-ASCII characters are dropped, path separators and whitespace runs
/// become `_`, anything outside `[A-Za-z0-9_.-]` is removed and leading or
/// trailing `.`/`_` are stripped.
pub fn sanitize_filename(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Validate a filename and return its sanitized form
pub fn validate_filename(file_name: &str, allowed: &[String]) -> Result<String, UploadRejection> {
    if file_name.is_empty() {
        return Err(UploadRejection::EmptyFilename);
    }
    if !allowed_file(file_name, allowed) {
        return Err(UploadRejection::UnsupportedType);
    }

    let sanitized = sanitize_filename(file_name);
    if sanitized.is_empty() {
        return Err(UploadRejection::UnsupportedType);
    }
    Ok(sanitized)
}

/// Write `data` as `file_name` under `dir`, replacing any existing file
pub async fn stage(dir: &Path, file_name: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    let path = dir.join(file_name);
    tokio::fs::write(&path, data).await?;
    Ok(path)
}
