//! InferenceEngine trait - the seam between the upload handler and a model

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InferenceResult;

/// One emitted label: an index into the [`Alphabet`](crate::Alphabet)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Alphabet index, the blank index, or `-1` for "no prediction"
    pub index: i64,
    /// Probability of this label, if the model exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f32>,
}

impl Label {
    /// Label without probability information
    pub fn new(index: i64) -> Self {
        Self {
            index,
            probability: None,
        }
    }

    /// Label carrying the probability the model assigned to it
    pub fn with_probability(index: i64, probability: f32) -> Self {
        Self {
            index,
            probability: Some(probability),
        }
    }
}

impl From<i64> for Label {
    fn from(index: i64) -> Self {
        Self::new(index)
    }
}

/// Result of one inference call
///
/// Engines return one sequence per image of the batch. The service always
/// submits a batch of one and reads the first sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub sequences: Vec<Vec<Label>>,
}

impl Prediction {
    /// Prediction holding a single label sequence
    pub fn single(labels: Vec<Label>) -> Self {
        Self {
            sequences: vec![labels],
        }
    }

    /// Prediction from bare indices (no probabilities)
    pub fn from_indices(indices: impl IntoIterator<Item = i64>) -> Self {
        Self::single(indices.into_iter().map(Label::new).collect())
    }

    /// First sequence of the batch, empty if the engine produced none
    pub fn first(&self) -> &[Label] {
        self.sequences.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// An engine that turns an image file into label sequences
///
/// Implementations are blocking; callers on an async runtime are expected
/// to run `predict` on a blocking thread.
pub trait InferenceEngine: Send + Sync + 'static {
    /// Run the model at `model_path` on the image at `image_path`
    fn predict(&self, image_path: &Path, model_path: &Path) -> InferenceResult<Prediction>;
}
