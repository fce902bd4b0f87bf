//! Reading types shared by the API layer and stores

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A label sequence decoded through the alphabet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedReading {
    /// Decoded meter value
    pub reading: String,
    /// One entry per character of `reading`, in order
    pub digits: Vec<String>,
    /// Mean probability of the decoded labels carrying one, 0 when none does
    /// (empty readings and index-only engines alike)
    pub confidence: f32,
}

impl DecodedReading {
    pub fn is_empty(&self) -> bool {
        self.reading.is_empty()
    }
}

/// A row of the `readings` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub id: i64,
    pub reading: String,
    pub timestamp: NaiveDateTime,
}
