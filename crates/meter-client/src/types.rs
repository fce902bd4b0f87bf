//! Response types returned by the reading service

use serde::{Deserialize, Serialize};

/// Successful `POST /upload` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub reading: String,
    pub digits: Vec<String>,
    /// Mean probability of the decoded symbols
    ///
    /// 0 for an empty reading, and also for a non-empty reading when the
    /// model only reports label indices. Check `digits` before treating 0 as
    /// "no confidence".
    pub confidence: f32,
}

/// Error body returned by the service
///
/// Persistence failures also carry the reading that could not be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}
