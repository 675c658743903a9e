//! Inference Engine
//!
//! Wraps a loaded TensorFlow Lite classifier behind the `InferenceEngine`
//! trait. The model is parsed, shape-specialized and optimized once at load
//! time; afterwards the plan is read-only and every `infer` call builds its
//! own execution state, so one engine can be shared across threads.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};
use tract_tflite::prelude::*;
use tract_tflite::internal::DimLike;

use super::preprocess::{InputSize, InputTensor, CHANNELS};
use crate::utils::error::{FoodVisionError, Result};

/// FlatBuffers file identifier of TFLite models (bytes 4..8)
const TFLITE_IDENTIFIER: &[u8; 4] = b"TFL3";

/// A loaded classifier producing one score per class
pub trait InferenceEngine: Send + Sync {
    /// Spatial input size the model was built for
    fn input_size(&self) -> InputSize;

    /// Number of scores per forward pass, when the model declares it
    fn class_count(&self) -> Option<usize>;

    /// Run exactly one forward pass
    fn infer(&self, input: &InputTensor) -> Result<Vec<f32>>;
}

/// Element type of the model's input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPrecision {
    Float32,
    /// Quantized models take raw 0..=255 pixels
    Uint8,
}

/// Shape and type metadata captured at load time
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub path: PathBuf,
    pub input_size: InputSize,
    pub input_precision: InputPrecision,
    pub class_count: Option<usize>,
}

/// TFLite classifier executed with tract
pub struct TfliteEngine {
    plan: TypedRunnableModel<TypedModel>,
    info: ModelInfo,
}

impl std::fmt::Debug for TfliteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfliteEngine").field("info", &self.info).finish()
    }
}

impl TfliteEngine {
    /// Load a `.tflite` model from disk
    ///
    /// `fallback_size` is used for any spatial dimension the model leaves
    /// symbolic. Any failure here is fatal for serving.
    pub fn load(path: &Path, fallback_size: u32) -> Result<Self> {
        let raw = fs::read(path).map_err(|e| model_error(path, e.to_string()))?;
        Self::from_bytes(path, &raw, fallback_size)
    }

    /// Build an engine from model bytes; `path` is only used for reporting
    pub fn from_bytes(path: &Path, raw: &[u8], fallback_size: u32) -> Result<Self> {
        let start = Instant::now();

        if raw.is_empty() {
            return Err(model_error(path, "model file is empty"));
        }
        let bytes = locate_flatbuffer(raw)
            .ok_or_else(|| model_error(path, "no TFLite flatbuffer (TFL3 identifier) found"))?;

        let mut cursor = Cursor::new(bytes);
        let model = tract_tflite::tflite()
            .model_for_read(&mut cursor)
            .map_err(|e| model_error(path, format!("TFLite parse error: {e:#}")))?;

        let inlet = model
            .input_outlets()
            .map_err(|e| model_error(path, format!("{e:#}")))?
            .first()
            .copied()
            .ok_or_else(|| model_error(path, "model declares no inputs"))?;
        let fact = model
            .outlet_fact(inlet)
            .map_err(|e| model_error(path, format!("{e:#}")))?
            .clone();

        let input_precision = match fact.datum_type.unquantized() {
            DatumType::F32 => InputPrecision::Float32,
            DatumType::U8 => InputPrecision::Uint8,
            dt => {
                return Err(model_error(
                    path,
                    format!("unsupported input type {dt:?} (only f32 and u8 are supported)"),
                ))
            }
        };

        let dims: Vec<Option<usize>> = fact.shape.iter().map(|d| d.to_usize().ok()).collect();
        let input_size = resolve_input_size(&dims, fallback_size).map_err(|reason| model_error(path, reason))?;

        let input_dt = match input_precision {
            InputPrecision::Float32 => f32::datum_type(),
            InputPrecision::Uint8 => u8::datum_type(),
        };
        let shape = input_size.tensor_shape();
        let plan = model
            .with_input_fact(0, TypedFact::dt_shape(input_dt, tvec!(shape[0], shape[1], shape[2], shape[3])))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| model_error(path, format!("cannot optimize model: {e:#}")))?;

        let class_count = plan
            .model()
            .output_fact(0)
            .ok()
            .and_then(|f| f.shape.as_concrete().map(|s| s.iter().product::<usize>()));

        let info = ModelInfo {
            path: path.to_path_buf(),
            input_size,
            input_precision,
            class_count,
        };

        info!(
            "Loaded model {:?} in {:.1}ms (input {}, {:?}, {} classes)",
            path,
            start.elapsed().as_secs_f64() * 1000.0,
            input_size,
            input_precision,
            class_count.map_or_else(|| "unknown".to_string(), |c| c.to_string())
        );

        Ok(Self { plan, info })
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn to_tensor(&self, input: &InputTensor) -> Result<Tensor> {
        let [n, h, w, c] = input.shape();
        let tensor: Tensor = match self.info.input_precision {
            InputPrecision::Float32 => {
                tract_ndarray::Array4::from_shape_vec((n, h, w, c), input.data().to_vec())
                    .map_err(|e| FoodVisionError::Prediction(format!("cannot shape input tensor: {e}")))?
                    .into()
            }
            InputPrecision::Uint8 => {
                tract_ndarray::Array4::from_shape_vec((n, h, w, c), quantize_pixels(input.data()))
                    .map_err(|e| FoodVisionError::Prediction(format!("cannot shape input tensor: {e}")))?
                    .into()
            }
        };
        Ok(tensor)
    }
}

impl InferenceEngine for TfliteEngine {
    fn input_size(&self) -> InputSize {
        self.info.input_size
    }

    fn class_count(&self) -> Option<usize> {
        self.info.class_count
    }

    fn infer(&self, input: &InputTensor) -> Result<Vec<f32>> {
        check_input_size(self.info.input_size, input)?;

        let start = Instant::now();
        let tensor = self.to_tensor(input)?;
        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| FoodVisionError::Prediction(format!("inference failed: {e:#}")))?;

        let output = outputs
            .first()
            .ok_or_else(|| FoodVisionError::Prediction("model produced no outputs".to_string()))?;

        let scores: Vec<f32> = match output.datum_type().unquantized() {
            DatumType::U8 => dequantize_scores(
                output
                    .to_array_view::<u8>()
                    .map_err(|e| FoodVisionError::Prediction(format!("{e:#}")))?
                    .iter(),
            ),
            _ => output
                .cast_to::<f32>()
                .and_then(|t| t.as_slice::<f32>().map(|s| s.to_vec()))
                .map_err(|e| FoodVisionError::Prediction(format!("output is not numeric: {e:#}")))?,
        };

        debug!(
            "Forward pass produced {} scores in {:.2}ms",
            scores.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(scores)
    }
}

/// NHWC input size from the declared input dims
///
/// Symbolic height or width (`None`) falls back to `fallback_size`; an
/// unknown channel count is accepted.
fn resolve_input_size(dims: &[Option<usize>], fallback_size: u32) -> std::result::Result<InputSize, String> {
    if dims.len() != 4 {
        return Err(format!("expected a rank-4 NHWC input, found rank {}", dims.len()));
    }
    if let Some(channels) = dims[3] {
        if channels != CHANNELS {
            return Err(format!("expected {} input channels, found {}", CHANNELS, channels));
        }
    }

    let height = dims[1].map_or(fallback_size, |d| d as u32);
    let width = dims[2].map_or(fallback_size, |d| d as u32);
    if height == 0 || width == 0 {
        return Err("model input has a zero spatial dimension".to_string());
    }
    Ok(InputSize::new(height, width))
}

fn check_input_size(expected: InputSize, input: &InputTensor) -> Result<()> {
    if input.size() != expected {
        return Err(FoodVisionError::Prediction(format!(
            "input tensor is {} but the model expects {}",
            input.size(),
            expected
        )));
    }
    Ok(())
}

/// [0, 1] channel values back to raw 0..=255 pixels for u8-input models
fn quantize_pixels(data: &[f32]) -> Vec<u8> {
    data.iter()
        .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// u8 model outputs rescaled to [0, 1]
fn dequantize_scores<'a>(raw: impl IntoIterator<Item = &'a u8>) -> Vec<f32> {
    raw.into_iter().map(|&v| v as f32 / 255.0).collect()
}

fn model_error(path: &Path, reason: impl Into<String>) -> FoodVisionError {
    FoodVisionError::ModelLoad {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Find the start of a TFLite flatbuffer inside `buf`
///
/// Some exporters prepend metadata; the model begins four bytes before the
/// `TFL3` file identifier.
pub fn locate_flatbuffer(buf: &[u8]) -> Option<&[u8]> {
    if buf.len() < 8 {
        return None;
    }
    (0..=buf.len() - 8)
        .find(|&i| &buf[i + 4..i + 8] == TFLITE_IDENTIFIER)
        .map(|i| &buf[i..])
}
