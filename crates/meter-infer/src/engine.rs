//! tract-onnx backed inference engine

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use meter_core::{InferenceEngine, InferenceError, InferenceResult, Label, Prediction};
use parking_lot::Mutex;
use tract_onnx::prelude::*;

use crate::config::{ModelConfig, ScoreKind};
use crate::ctc::greedy_decode;
use crate::transform::Pipeline;

type TractSimplePlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Inference engine running ONNX models with tract
///
/// Models are loaded on first use and cached per path, so the expensive
/// optimisation pass runs once per model file.
pub struct TractEngine {
    config: ModelConfig,
    pipeline: Pipeline,
    plans: Mutex<HashMap<PathBuf, Arc<TractSimplePlan>>>,
}

impl TractEngine {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            pipeline: Pipeline::for_model(&config),
            config,
            plans: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Load (or fetch from cache) the runnable plan for `model_path`
    ///
    /// The cache lock is not held while a model is optimised. Two callers
    /// racing on the same cold path may both load it; the first insert wins.
    pub fn load(&self, model_path: &Path) -> InferenceResult<Arc<TractSimplePlan>> {
        if let Some(plan) = self.plans.lock().get(model_path) {
            return Ok(plan.clone());
        }

        let plan = Arc::new(self.load_uncached(model_path)?);
        Ok(self
            .plans
            .lock()
            .entry(model_path.to_path_buf())
            .or_insert(plan)
            .clone())
    }

    fn load_uncached(&self, model_path: &Path) -> InferenceResult<TractSimplePlan> {
        let model_display = model_path.display().to_string();
        let [n, a, b, c] = self.config.input_shape();

        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|model| {
                model.with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(n, a, b, c)))
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::model_load(&model_display, e))?;

        tracing::info!(model = %model_display, input_shape = ?self.config.input_shape(), "Model loaded");
        Ok(plan)
    }
}

impl InferenceEngine for TractEngine {
    fn predict(&self, image_path: &Path, model_path: &Path) -> InferenceResult<Prediction> {
        let plan = self.load(model_path)?;

        let image = image::open(image_path).map_err(|e| {
            InferenceError::MalformedInput(format!(
                "cannot decode {}: {}",
                image_path.display(),
                e
            ))
        })?;
        let input = self.pipeline.run(image)?;

        let outputs = plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Execution(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::Decode("model produced no outputs".to_string()))?;

        let prediction = prediction_from_output(output, self.config.scores)?;
        tracing::debug!(
            image = %image_path.display(),
            labels = prediction.first().len(),
            "Inference finished"
        );
        Ok(prediction)
    }
}

/// Turn the first model output into label sequences, one per batch entry
fn prediction_from_output(output: &Tensor, kind: ScoreKind) -> InferenceResult<Prediction> {
    let shape = output.shape().to_vec();
    let decode_err = |e: TractError| InferenceError::Decode(e.to_string());

    match output.datum_type() {
        DatumType::I64 => {
            let values = output.as_slice::<i64>().map_err(decode_err)?;
            Ok(index_rows(values.iter().copied(), &shape))
        }
        DatumType::I32 => {
            let values = output.as_slice::<i32>().map_err(decode_err)?;
            Ok(index_rows(values.iter().map(|&v| v as i64), &shape))
        }
        DatumType::F32 => {
            let values = output.as_slice::<f32>().map_err(decode_err)?;
            let (batch, classes) = match shape.as_slice() {
                [_, classes] => (1, *classes),
                [batch, _, classes] => (*batch, *classes),
                other => {
                    return Err(InferenceError::Decode(format!(
                        "expected [batch, steps, classes] scores, got shape {:?}",
                        other
                    )))
                }
            };
            if batch == 0 || classes == 0 || values.is_empty() {
                return Ok(Prediction::single(Vec::new()));
            }

            let per_batch = values.len() / batch;
            let sequences = values
                .chunks(per_batch)
                .map(|scores| greedy_decode(scores, classes, kind))
                .collect();
            Ok(Prediction { sequences })
        }
        other => Err(InferenceError::Decode(format!(
            "unsupported output type {:?}",
            other
        ))),
    }
}

/// Split decoded indices into batch rows; rank <= 1 is a single row
fn index_rows(values: impl Iterator<Item = i64>, shape: &[usize]) -> Prediction {
    let labels: Vec<Label> = values.map(Label::new).collect();
    let row_len = match shape {
        [_, rest @ ..] if !rest.is_empty() => rest.iter().product(),
        _ => labels.len(),
    };

    if row_len == 0 {
        return Prediction::single(Vec::new());
    }
    Prediction {
        sequences: labels.chunks(row_len).map(<[Label]>::to_vec).collect(),
    }
}
