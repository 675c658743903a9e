//! # Food Vision
//!
//! A Rust library for classifying food photos with a pretrained TensorFlow
//! Lite model and enriching the prediction with nutrition facts and a short
//! dietary recommendation.
//!
//! ## Features
//!
//! - **TFLite inference** through tract, with float and u8-quantized models
//! - **Deterministic preprocessing**: decode, stretch-resize, scale to [0, 1]
//! - **Top-3 ranking** with stable lowest-index tie-breaking
//! - **Nutrition catalog** provisioned from a JSON resource
//! - **Batch prediction** over directories with rayon
//!
//! ## Modules
//!
//! - `catalog`: class registry, nutrition catalog and recommendation rules
//! - `inference`: preprocessing, model runtime, predictor and batch runner
//! - `config`: predictor configuration
//! - `utils`: logging, errors, and helper functions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use food_vision::{Predictor, PredictorConfig};
//!
//! let predictor = Predictor::from_config(&PredictorConfig::default())?;
//! let result = predictor.predict(&std::fs::read("lunch.jpg")?)?;
//! println!("{} ({:.1}%)", result.top_label, result.confidence * 100.0);
//! ```

pub mod catalog;
pub mod config;
pub mod inference;
pub mod utils;

// Re-export commonly used items for convenience
pub use catalog::{recommend, ClassRegistry, NutritionCatalog, NutritionFacts};
pub use config::{OutputActivation, PredictorConfig};
pub use inference::batch::{predict_directory, BatchReport, BatchSummary};
pub use inference::engine::{InferenceEngine, TfliteEngine};
pub use inference::predictor::{HealthStatus, PredictionCandidate, PredictionResult, Predictor};
pub use utils::error::{FoodVisionError, Result};

/// Input size assumed when a model leaves its spatial dimensions symbolic
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
