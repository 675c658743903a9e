//! Tracing subscriber setup for the CLI and the HTTP server
//!
//! Log lines go to stderr so `food_vision predict --json` keeps stdout clean
//! for the JSON document.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use super::error::{FoodVisionError, Result};

/// How the global subscriber is configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    /// Print the module path of each event
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub ansi_colors: bool,
}

impl LogConfig {
    /// Interactive terminal output; `verbose` adds debug events and their origin
    pub fn cli(verbose: bool) -> Self {
        Self {
            level: if verbose { Level::DEBUG } else { Level::INFO },
            show_target: verbose,
            show_thread_ids: false,
            ansi_colors: true,
        }
    }

    /// Plain output for a long-running service; request handlers run on
    /// several worker threads, so their ids are shown
    pub fn server(level: Level) -> Self {
        Self {
            level,
            show_target: false,
            show_thread_ids: true,
            ansi_colors: false,
        }
    }
}

/// Parse a level name such as `info` or `DEBUG`
pub fn parse_level(name: &str) -> Result<Level> {
    name.trim().parse::<Level>().map_err(|_| {
        FoodVisionError::Configuration(format!(
            "unknown log level '{}' (expected trace, debug, info, warn or error)",
            name
        ))
    })
}

/// Install the global subscriber; fails if one is already set
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level)
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi_colors)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        FoodVisionError::Configuration(format!("failed to install log subscriber: {}", e))
    })
}
