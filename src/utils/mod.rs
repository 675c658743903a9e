//! Utilities module for logging, error handling, and helper functions

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{FoodVisionError, Result, ResultExt};
pub use logging::{init_logging, parse_level, LogConfig};

/// Format a duration given in milliseconds in a human-readable way
pub fn format_duration_ms(millis: f64) -> String {
    if millis < 1.0 {
        format!("{:.0}µs", millis * 1000.0)
    } else if millis < 1000.0 {
        format!("{:.1}ms", millis)
    } else if millis < 60_000.0 {
        format!("{:.2}s", millis / 1000.0)
    } else {
        let minutes = (millis / 60_000.0).floor();
        let secs = (millis % 60_000.0) / 1000.0;
        format!("{}m {:.0}s", minutes as u32, secs)
    }
}

/// Round a value to three decimal digits, the precision used for reported confidences
pub fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}
