//! Utility module for the Onflix player
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Configuration management
//! - Time and progress formatting helpers

pub mod config;
pub mod error;

pub use config::{ApiConfig, Config, GeneralConfig, PlayerSettings};
pub use error::{PlayerError, Result, StreamUnavailable};

/// Load the application configuration from the default locations
pub fn load_config() -> Result<Config> {
    Config::load()
}

/// Format a position in seconds for display
///
/// Produces "H:MM:SS" for an hour or more and "M:SS" below that.
/// Negative and non-finite inputs render as "0:00".
pub fn format_time(seconds: f64) -> String {
    let total_secs = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Percentage of `duration` covered by `position`, in `[0, 100]`
pub fn progress_percent(position: f64, duration: f64) -> f64 {
    if duration <= 0.0 || !duration.is_finite() {
        return 0.0;
    }
    (position / duration * 100.0).clamp(0.0, 100.0)
}
