//! Error Handling Module
//!
//! Defines the error taxonomy for the food classification pipeline.
//! Startup failures (`Configuration`, `ModelLoad`) are distinguished from
//! per-request failures (`Decode`, `Prediction`) so callers can decide
//! whether to degrade, abort, or report back to the client.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for food classification operations
#[derive(Error, Debug)]
pub enum FoodVisionError {
    /// Class registry, nutrition resource or config file could not be used
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Model artifact missing, corrupt or of an unsupported layout
    #[error("Failed to load model at '{path}': {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// Input bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Preprocessing or inference failed for a single request
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FoodVisionError {
    /// Whether the failure was caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::InvalidInput(_))
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::ModelLoad { .. } => "model_load",
            Self::Decode(_) => "decode",
            Self::Prediction(_) => "prediction",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<serde_json::Error> for FoodVisionError {
    fn from(err: serde_json::Error) -> Self {
        FoodVisionError::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for FoodVisionError {
    fn from(err: image::ImageError) -> Self {
        FoodVisionError::Decode(err.to_string())
    }
}

/// Convenience Result type for food classification operations
pub type Result<T> = std::result::Result<T, FoodVisionError>;

/// Converts foreign errors into a `FoodVisionError` of a chosen kind
pub trait ResultExt<T> {
    /// Wrap the error as `kind`, prefixed with a lazily built context message
    ///
    /// ```rust,ignore
    /// fs::read_to_string(path).context_as(FoodVisionError::Configuration, || format!("cannot read {:?}", path))?;
    /// ```
    fn context_as<F>(self, kind: fn(String) -> FoodVisionError, context: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn context_as<F>(self, kind: fn(String) -> FoodVisionError, context: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| kind(format!("{}: {}", context(), e)))
    }
}
