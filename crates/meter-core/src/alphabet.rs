//! Alphabet - maps label indices to reading symbols
//!
//! The recognizer emits indices into `0-9a-z.`; index `len()` is the CTC
//! blank and `-1` pads sequences that produced nothing. Both are dropped
//! while decoding, so a reading only ever contains alphabet symbols.

use crate::engine::Label;
use crate::error::{InferenceError, InferenceResult};
use crate::models::DecodedReading;

/// Out-of-band index meaning "no prediction"
pub const NO_PREDICTION: i64 = -1;

const DEFAULT_SYMBOLS: &str = "0123456789abcdefghijklmnopqrstuvwxyz.";

/// Ordered symbol set used to decode label sequences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new(DEFAULT_SYMBOLS)
    }
}

impl Alphabet {
    /// Create an alphabet from its symbols, in index order
    pub fn new(symbols: &str) -> Self {
        Self {
            symbols: symbols.chars().collect(),
        }
    }

    /// Number of symbols (not counting the blank)
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Reserved index for "no symbol at this position"
    pub fn blank_index(&self) -> i64 {
        self.symbols.len() as i64
    }

    /// Whether `index` is dropped during decoding
    pub fn is_skipped(&self, index: i64) -> bool {
        index == self.blank_index() || index == NO_PREDICTION
    }

    /// Symbol for an index, if it is a real alphabet entry
    pub fn symbol(&self, index: i64) -> Option<char> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.symbols.get(i))
            .copied()
    }

    /// Decode a label sequence into a reading
    ///
    /// Blank and [`NO_PREDICTION`] labels are dropped. Any other index outside
    /// the alphabet is an error rather than being silently ignored.
    pub fn decode(&self, labels: &[Label]) -> InferenceResult<DecodedReading> {
        let mut reading = String::with_capacity(labels.len());
        let mut digits = Vec::with_capacity(labels.len());
        let mut probability_sum = 0.0f32;
        let mut probability_count = 0usize;

        for label in labels {
            if self.is_skipped(label.index) {
                continue;
            }
            let symbol = self.symbol(label.index).ok_or_else(|| {
                InferenceError::Decode(format!(
                    "label index {} outside alphabet of {} symbols",
                    label.index,
                    self.len()
                ))
            })?;

            reading.push(symbol);
            digits.push(symbol.to_string());
            if let Some(p) = label.probability {
                probability_sum += p;
                probability_count += 1;
            }
        }

        let confidence = if probability_count == 0 {
            0.0
        } else {
            probability_sum / probability_count as f32
        };

        Ok(DecodedReading {
            reading,
            digits,
            confidence,
        })
    }
}
