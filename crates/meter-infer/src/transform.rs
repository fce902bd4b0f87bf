//! Image preprocessing pipeline
//!
//! A pipeline is an ordered list of [`Transform`] steps applied to a
//! [`Stage`]. The default pipeline built from a [`ModelConfig`] converts
//! colour, resizes to the model input and produces an `f32` tensor in the
//! configured layout.

use image::imageops::FilterType;
use image::DynamicImage;
use meter_core::{InferenceError, InferenceResult};
use tract_onnx::prelude::{tract_ndarray, Tensor};

use crate::config::{ChannelLayout, ModelConfig, PixelScale};

/// Intermediate value flowing through the pipeline
pub enum Stage {
    Image(DynamicImage),
    Tensor(Tensor),
}

/// One preprocessing step
#[derive(Debug, Clone)]
pub enum Transform {
    /// Convert to grayscale (1 channel) or RGB (3 channels)
    ConvertColor { channels: usize },
    /// Resize ignoring aspect ratio
    Resize {
        width: u32,
        height: u32,
        filter: FilterType,
    },
    /// Pack pixels into a batch-of-one tensor
    ToTensor {
        channels: usize,
        layout: ChannelLayout,
        scale: PixelScale,
    },
}

impl Transform {
    pub fn apply(&self, input: Stage) -> InferenceResult<Stage> {
        let image = match input {
            Stage::Image(image) => image,
            Stage::Tensor(_) => {
                return Err(InferenceError::Internal(format!(
                    "{:?} cannot be applied to a tensor",
                    self
                )))
            }
        };

        match self {
            Transform::ConvertColor { channels } => match channels {
                1 => Ok(Stage::Image(DynamicImage::ImageLuma8(image.to_luma8()))),
                3 => Ok(Stage::Image(DynamicImage::ImageRgb8(image.to_rgb8()))),
                n => Err(unsupported_channels(*n)),
            },
            Transform::Resize {
                width,
                height,
                filter,
            } => Ok(Stage::Image(image.resize_exact(*width, *height, *filter))),
            Transform::ToTensor {
                channels,
                layout,
                scale,
            } => image_to_tensor(&image, *channels, *layout, *scale).map(Stage::Tensor),
        }
    }
}

/// Ordered preprocessing steps
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<Transform>,
}

impl Pipeline {
    pub fn new(steps: Vec<Transform>) -> Self {
        Self { steps }
    }

    /// Colour conversion, resize and tensor packing for `config`
    pub fn for_model(config: &ModelConfig) -> Self {
        Self::new(vec![
            Transform::ConvertColor {
                channels: config.channels,
            },
            Transform::Resize {
                width: config.input_width as u32,
                height: config.input_height as u32,
                filter: FilterType::Triangle,
            },
            Transform::ToTensor {
                channels: config.channels,
                layout: config.layout,
                scale: config.scale,
            },
        ])
    }

    pub fn run(&self, image: DynamicImage) -> InferenceResult<Tensor> {
        let mut stage = Stage::Image(image);
        for step in &self.steps {
            stage = step.apply(stage)?;
        }

        match stage {
            Stage::Tensor(tensor) => Ok(tensor),
            Stage::Image(_) => Err(InferenceError::Internal(
                "pipeline did not produce a tensor".to_string(),
            )),
        }
    }
}

fn image_to_tensor(
    image: &DynamicImage,
    channels: usize,
    layout: ChannelLayout,
    scale: PixelScale,
) -> InferenceResult<Tensor> {
    let width = image.width() as usize;
    let height = image.height() as usize;

    let pixels = match channels {
        1 => image.to_luma8().into_raw(),
        3 => image.to_rgb8().into_raw(),
        n => return Err(unsupported_channels(n)),
    };

    let factor = match scale {
        PixelScale::Unit => 1.0 / 255.0,
        PixelScale::Raw => 1.0,
    };
    let value = |y: usize, x: usize, c: usize| pixels[(y * width + x) * channels + c] as f32 * factor;

    let array = match layout {
        ChannelLayout::Nhwc => {
            tract_ndarray::Array4::from_shape_fn((1, height, width, channels), |(_, y, x, c)| {
                value(y, x, c)
            })
        }
        ChannelLayout::Nchw => {
            tract_ndarray::Array4::from_shape_fn((1, channels, height, width), |(_, c, y, x)| {
                value(y, x, c)
            })
        }
    };

    Ok(array.into())
}

fn unsupported_channels(channels: usize) -> InferenceError {
    InferenceError::MalformedInput(format!(
        "unsupported channel count {} (expected 1 or 3)",
        channels
    ))
}
