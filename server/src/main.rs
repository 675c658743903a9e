//! Food Vision Server
//!
//! HTTP API in front of the food classifier. The model and class names are
//! loaded once at startup and shared by every request.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use food_vision::utils::logging::{init_logging, parse_level, LogConfig};
use food_vision::{OutputActivation, Predictor, PredictorConfig};
use tracing::{error, info, warn};

use crate::state::{AppState, ServerConfig};

/// Food Vision Server
#[derive(Parser, Debug)]
#[command(name = "food-vision-server")]
#[command(version)]
#[command(about = "HTTP API for food image classification")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "5000", env = "FOOD_VISION_PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "FOOD_VISION_HOST")]
    host: String,

    /// JSON predictor configuration file
    #[arg(short, long, env = "FOOD_VISION_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the .tflite model
    #[arg(long, env = "FOOD_VISION_MODEL")]
    model: Option<PathBuf>,

    /// Path to the newline-delimited class names
    #[arg(long, env = "FOOD_VISION_CLASSES")]
    classes: Option<PathBuf>,

    /// Replacement nutrition catalog (JSON)
    #[arg(long, env = "FOOD_VISION_NUTRITION")]
    nutrition: Option<PathBuf>,

    /// Apply softmax to the raw model outputs
    #[arg(long, default_value = "false")]
    softmax: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "FOOD_VISION_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_config = LogConfig::server(parse_level(&cli.log_level)?);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // Build configuration
    let mut config = ServerConfig::default();

    if let Some(path) = &cli.config {
        config.predictor = PredictorConfig::load(path)?;
    }

    if let Some(model) = cli.model {
        config.predictor.model_path = model;
    }

    if let Some(classes) = cli.classes {
        config.predictor.class_names_path = classes;
    }

    if let Some(nutrition) = cli.nutrition {
        config.predictor.nutrition_path = Some(nutrition);
    }

    if cli.softmax {
        config.predictor.output_activation = OutputActivation::Softmax;
    }

    info!("Food Vision Server v{}", food_vision::VERSION);
    info!("Configuration:");
    info!("  Model:       {:?}", config.predictor.model_path);
    info!("  Class names: {:?}", config.predictor.class_names_path);
    info!("  Nutrition:   {:?}", config.predictor.nutrition_path);
    info!("  Activation:  {:?}", config.predictor.output_activation);

    // A model that fails to load means no predictions can be served
    let predictor = Predictor::from_config(&config.predictor).map_err(|e| {
        error!("{}", e);
        e
    })?;

    if predictor.classes().is_sentinel() {
        warn!("Serving in degraded mode with the sentinel class only");
    }

    // Create shared state
    let state = Arc::new(AppState::new(config, predictor)?);

    // Build router
    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
