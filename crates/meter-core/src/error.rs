//! Common error types for inference engines and reading stores

use thiserror::Error;

/// Result type for inference operations
pub type InferenceResult<T> = Result<T, InferenceError>;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while running inference on a staged image
///
/// The HTTP layer collapses all of these into a single processing error,
/// but engines report which stage failed so logs stay useful.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Model file could not be read, parsed or optimized
    #[error("Failed to load model '{path}': {message}")]
    ModelLoad { path: String, message: String },

    /// Image could not be opened or does not match the model input
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Model execution failed
    #[error("Model execution failed: {0}")]
    Execution(String),

    /// Model output could not be turned into a label sequence
    #[error("Decode error: {0}")]
    Decode(String),

    /// Internal error (task join failure, poisoned state, ...)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InferenceError {
    /// Create a model load error for the given path
    pub fn model_load(path: impl Into<String>, message: impl ToString) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Errors that can occur in reading stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be reached (missing database, refused connection)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Statement was rejected (constraint violation, missing table, ...)
    #[error("Query failed: {0}")]
    Query(String),

    /// Connection was already closed
    #[error("Connection closed")]
    Closed,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
