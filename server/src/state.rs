//! Application state for the food vision server
//!
//! Holds the predictor loaded at startup, the upload limits and the HTTP
//! client used by `/predict/from_url`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use food_vision::{Predictor, PredictorConfig};
use serde::{Deserialize, Serialize};

/// Largest accepted upload (5 MiB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Timeout for fetching an image by URL
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Upload extensions accepted by `/predict`
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Model, class names and catalog locations
    pub predictor: PredictorConfig,
    /// Maximum upload or download size in bytes
    pub max_file_size: usize,
    /// Timeout for `/predict/from_url` downloads
    pub download_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            predictor: PredictorConfig::default(),
            max_file_size: MAX_FILE_SIZE,
            download_timeout_secs: DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Predictor shared by every request
    pub predictor: Arc<Predictor>,
    /// Client for image downloads
    pub http: reqwest::Client,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, predictor: Predictor) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()?;

        Ok(Self {
            config,
            predictor: Arc::new(predictor),
            http,
            started_at: Instant::now(),
        })
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
