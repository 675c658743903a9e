//! Predictor Configuration
//!
//! Locations of the startup artifacts and the few knobs of the inference
//! pipeline. Binaries start from `PredictorConfig::default()`, apply an
//! optional JSON file and then command-line / environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::error::{FoodVisionError, Result, ResultExt};
use crate::DEFAULT_INPUT_SIZE;

/// How raw model outputs are turned into confidences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// Use the scores exactly as the model emits them
    #[default]
    None,
    /// Apply softmax (for models whose last layer emits logits)
    Softmax,
}

impl OutputActivation {
    /// Apply the activation to a score vector in place
    pub fn apply(&self, scores: &mut [f32]) {
        match self {
            OutputActivation::None => {}
            OutputActivation::Softmax => softmax_in_place(scores),
        }
    }
}

/// Softmax over `scores`; NaN carries no probability mass
///
/// `+inf` entries share all of the mass. When nothing is finite or `+inf`
/// the result is uniform, so the output always sums to one.
fn softmax_in_place(scores: &mut [f32]) {
    if scores.is_empty() {
        return;
    }

    let max = scores
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f32::NEG_INFINITY, f32::max);

    if max == f32::NEG_INFINITY {
        let uniform = 1.0 / scores.len() as f32;
        scores.iter_mut().for_each(|v| *v = uniform);
        return;
    }

    let mut sum = 0.0f32;
    for v in scores.iter_mut() {
        *v = if v.is_nan() {
            0.0
        } else if max == f32::INFINITY {
            if *v == f32::INFINITY { 1.0 } else { 0.0 }
        } else {
            (*v - max).exp()
        };
        sum += *v;
    }

    // The maximum contributes exp(0) = 1, so sum >= 1
    for v in scores.iter_mut() {
        *v /= sum;
    }
}

/// Configuration for building a `Predictor`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Path to the `.tflite` classifier
    pub model_path: PathBuf,

    /// Newline-delimited class names, in model output order
    pub class_names_path: PathBuf,

    /// Replacement nutrition catalog (JSON); the embedded one is used when unset
    pub nutrition_path: Option<PathBuf>,

    /// Post-processing applied to the raw scores
    pub output_activation: OutputActivation,

    /// Spatial size used when the model leaves its input dimensions symbolic
    pub fallback_input_size: u32,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/fruit_classifier.tflite"),
            class_names_path: PathBuf::from("model/class_names.txt"),
            nutrition_path: None,
            output_activation: OutputActivation::None,
            fallback_input_size: DEFAULT_INPUT_SIZE,
        }
    }
}

impl PredictorConfig {
    /// Default layout rooted at a model directory
    pub fn from_model_dir(dir: &Path) -> Self {
        Self {
            model_path: dir.join("fruit_classifier.tflite"),
            class_names_path: dir.join("class_names.txt"),
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model_path.as_os_str().is_empty() {
            return Err(FoodVisionError::Configuration(
                "model_path must not be empty".to_string(),
            ));
        }

        if self.fallback_input_size == 0 {
            return Err(FoodVisionError::Configuration(
                "fallback_input_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .context_as(FoodVisionError::Configuration, || format!("cannot read config {:?}", path))?;
        let config: Self = serde_json::from_str(&json)
            .context_as(FoodVisionError::Configuration, || format!("invalid config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }
}
