//! meter-infer - ONNX inference engine for meter readings
//!
//! [`TractEngine`] implements [`meter_core::InferenceEngine`] on top of
//! `tract-onnx`. Images go through a small preprocessing pipeline
//! (colour conversion, resize, scaling into the model layout), the model is
//! run, and its output is turned into label sequences:
//! - integer outputs are taken as already-decoded label indices
//! - float outputs `[batch, steps, classes]` are greedy CTC decoded, with
//!   the last class as the blank

pub mod config;
pub mod ctc;
mod engine;
pub mod transform;

pub use config::{ChannelLayout, ModelConfig, PixelScale, ScoreKind};
pub use engine::TractEngine;
