//! Model configuration

use std::path::PathBuf;

use serde::Deserialize;

/// Memory layout of the model input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    /// `[batch, height, width, channels]` (Keras default)
    Nhwc,
    /// `[batch, channels, height, width]`
    Nchw,
}

/// How pixel values are scaled before entering the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelScale {
    /// Divide by 255 into `[0, 1]`
    Unit,
    /// Keep `[0, 255]` (model rescales itself)
    Raw,
}

/// What a float output holds per time step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    /// Output already went through softmax
    Probabilities,
    /// Raw scores, softmax is applied while decoding
    Logits,
}

/// `[model]` section of the service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model file used when none is given on the command line
    pub path: PathBuf,
    pub input_width: usize,
    pub input_height: usize,
    /// 1 for grayscale, 3 for RGB
    pub channels: usize,
    pub layout: ChannelLayout,
    pub scale: PixelScale,
    pub scores: ScoreKind,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model.onnx"),
            input_width: 200,
            input_height: 31,
            channels: 1,
            layout: ChannelLayout::Nhwc,
            scale: PixelScale::Unit,
            scores: ScoreKind::Probabilities,
        }
    }
}

impl ModelConfig {
    /// Shape of the single input tensor, batch of one
    pub fn input_shape(&self) -> [usize; 4] {
        match self.layout {
            ChannelLayout::Nhwc => [1, self.input_height, self.input_width, self.channels],
            ChannelLayout::Nchw => [1, self.channels, self.input_height, self.input_width],
        }
    }
}
