//! Inference pipeline
//!
//! This module provides:
//! - Image decoding and tensor preparation (`preprocess`)
//! - The model runtime behind the `InferenceEngine` trait (`engine`)
//! - Single-image prediction with ranking and enrichment (`predictor`)
//! - Parallel prediction over directories (`batch`)

pub mod batch;
pub mod engine;
pub mod predictor;
pub mod preprocess;

// Re-export main types for convenience
pub use batch::{predict_directory, BatchReport, BatchSummary, FileOutcome};
pub use engine::{InferenceEngine, InputPrecision, ModelInfo, TfliteEngine};
pub use predictor::{HealthStatus, PredictionCandidate, PredictionResult, Predictor};
pub use preprocess::{InputSize, InputTensor};

/// Number of ranked candidates returned with every prediction
pub const TOP_K: usize = 3;
