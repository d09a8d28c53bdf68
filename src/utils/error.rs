//! Error types for the Onflix player
//!
//! This module defines the error taxonomy used by the playback controller.
//! We use thiserror for the library error types and anyhow for
//! binary-level error handling.

use crate::player::Quality;
use thiserror::Error;

/// Reasons a stream descriptor could not be resolved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamUnavailable {
    /// Transport failure or server-side error
    #[error("network failure: {0}")]
    Network(String),

    /// Content or episode does not exist
    #[error("content not found: {0}")]
    NotFound(String),

    /// The account is not entitled to this content or quality
    #[error("entitlement denied: {0}")]
    Denied(String),

    /// The backend answered with something we could not use
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Main error type for the player
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Stream descriptor fetch failed
    #[error("Stream unavailable: {0}")]
    StreamUnavailable(#[from] StreamUnavailable),

    /// Media element reported a decode or network error mid-playback
    #[error("Playback error: {0}")]
    Playback(String),

    /// Fetching a descriptor for a new quality failed
    #[error("Quality switch to {quality} failed: {reason}")]
    QualitySwitch {
        quality: Quality,
        reason: StreamUnavailable,
    },

    /// Progress delivery failed
    #[error("Progress delivery failed: {0}")]
    Progress(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PlayerError {
    /// Whether the retry affordance should be offered
    ///
    /// A failed quality switch leaves the previous stream playing, so there
    /// is nothing to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlayerError::StreamUnavailable(_) | PlayerError::Playback(_))
    }
}

/// Convenience type alias for Results in the player
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Extension trait for converting other errors to PlayerError
pub trait IntoPlayerError<T> {
    /// Convert this error into a PlayerError with the given context
    fn config_err(self, context: &str) -> Result<T>;
    fn progress_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoPlayerError<T> for std::result::Result<T, E> {
    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Config(format!("{}: {}", context, e)))
    }

    fn progress_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Progress(format!("{}: {}", context, e)))
    }
}
