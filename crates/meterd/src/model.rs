//! Model file lookup at startup

use std::fmt;
use std::path::{Path, PathBuf};

/// Model path that does not point at a file
#[derive(Debug)]
pub struct MissingModel {
    pub resolved: PathBuf,
    pub cwd: PathBuf,
    /// `*.onnx` files in the working directory
    pub candidates: Vec<String>,
}

impl fmt::Display for MissingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model file not found: {}", self.resolved.display())?;
        writeln!(f, "Working directory: {}", self.cwd.display())?;
        if self.candidates.is_empty() {
            write!(f, "No .onnx files found in the working directory")
        } else {
            write!(f, "Available models: {}", self.candidates.join(", "))
        }
    }
}

/// Make `path` absolute against `cwd` and check that it is a file
pub fn resolve_model(path: &Path, cwd: &Path) -> Result<PathBuf, MissingModel> {
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    if resolved.is_file() {
        return Ok(resolved);
    }

    Err(MissingModel {
        resolved,
        cwd: cwd.to_path_buf(),
        candidates: candidate_models(cwd),
    })
}

/// Sorted names of the `*.onnx` files directly under `dir`
pub fn candidate_models(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("onnx"))
        })
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}
