//! Playback controller module for the Onflix player
//!
//! This module coordinates a media element against a remote stream
//! descriptor, user input and watch-progress reporting. The controller owns
//! the media element exclusively; the rest of the application talks to it
//! through [`PlaybackController`] commands.

mod controller;
pub mod input;
pub mod media;
pub mod overlay;
pub mod progress;
pub mod session;
pub mod simulated;
mod state;

pub use controller::{ControllerMessage, FetchOutcome, LoadOptions, PlaybackController};
pub use input::{InputEvent, Key, PlayerCommand};
pub use media::{media_channel, MediaElement, MediaEvent, MediaEventReceiver, MediaEventSender};
pub use overlay::OverlayState;
pub use progress::{ProgressReporter, ProgressThrottle};
pub use session::{PlayerSession, SessionInput};
pub use simulated::SimulatedMedia;
pub use state::{Effect, PlaybackState, ResumePoint};

use crate::api::{ContentIdentity, ProgressReport, StreamDescriptor};
use crate::utils::error::PlayerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Playback rates offered by the settings menu
pub const PLAYBACK_RATES: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// Lifecycle phase of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// No stream bound
    Idle,

    /// Descriptor fetch or source bind in progress
    Loading,

    /// Metadata known, not yet started
    Ready,

    /// Currently playing
    Playing,

    /// Playback paused
    Paused,

    /// End of stream reached
    Ended,
}

/// Requested stream quality
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Quality {
    /// Let the backend pick
    #[default]
    Auto,

    /// Explicit variant label such as "720p" or "4k"
    Label(String),
}

impl Quality {
    /// Parse a wire label. Empty and "auto" (any case) map to [`Quality::Auto`].
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            Quality::Auto
        } else {
            Quality::Label(trimmed.to_string())
        }
    }

    /// Label sent to the backend, `None` for auto
    pub fn as_query(&self) -> Option<&str> {
        match self {
            Quality::Auto => None,
            Quality::Label(label) => Some(label),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Auto => f.write_str("auto"),
            Quality::Label(label) => f.write_str(label),
        }
    }
}

impl From<String> for Quality {
    fn from(label: String) -> Self {
        Quality::from_label(&label)
    }
}

impl From<Quality> for String {
    fn from(quality: Quality) -> Self {
        quality.to_string()
    }
}

/// Player configuration
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Start playing once the stream is ready
    pub auto_play: bool,

    /// Initial volume (0.0 to 1.0)
    pub default_volume: f64,

    /// Arrow-key seek step in seconds
    pub seek_step: f64,

    /// Arrow-key volume step
    pub volume_step: f64,

    /// Minimum spacing between progress reports
    pub progress_interval: Duration,

    /// Idle time before controls hide while playing
    pub controls_hide_after: Duration,

    /// Quality requested when the caller does not pick one
    pub default_quality: Quality,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            auto_play: false,
            default_volume: 1.0,
            seek_step: 10.0,
            volume_step: 0.1,
            progress_interval: Duration::from_secs(10),
            controls_hide_after: Duration::from_secs(3),
            default_quality: Quality::Auto,
        }
    }
}

/// Category of a failure surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    StreamUnavailable,
    Playback,
    QualitySwitch,
}

/// A failure recorded in the playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackFailure {
    pub kind: FailureKind,
    pub message: String,

    /// Whether the retry affordance should be shown
    pub retryable: bool,
}

impl PlaybackFailure {
    /// Record `err` as shown to the user
    pub fn from_error(err: &PlayerError) -> Self {
        let kind = match err {
            PlayerError::StreamUnavailable(_) => FailureKind::StreamUnavailable,
            PlayerError::QualitySwitch { .. } => FailureKind::QualitySwitch,
            _ => FailureKind::Playback,
        };
        Self {
            kind,
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Player event for external event handling
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Identity changed; all session state was reset
    Reset { identity: ContentIdentity },

    /// Descriptor fetch started
    Loading { quality: Quality },

    /// A descriptor was bound to the media element
    StreamBound { descriptor: StreamDescriptor },

    /// Metadata loaded
    Ready { duration: f64 },

    /// Playback started
    PlaybackStarted,

    /// Playback paused
    PlaybackPaused,

    /// Position changed
    PositionChanged { position: f64, duration: f64 },

    /// Buffering flag flipped
    BufferingChanged { buffering: bool },

    /// Volume or mute changed
    VolumeChanged { volume: f64, muted: bool },

    /// Playback rate changed
    SpeedChanged { rate: f64 },

    /// Quality switch completed
    QualityChanged { quality: Quality },

    /// Subtitle selection changed
    SubtitleChanged { language: Option<String> },

    /// Fullscreen toggled
    FullscreenChanged { fullscreen: bool },

    /// A progress report was handed to the sink
    ProgressReported { report: ProgressReport },

    /// End of stream reached
    Ended,

    /// Error occurred
    Error { failure: PlaybackFailure },
}

/// Player event handler trait
pub trait PlayerEventHandler: Send {
    fn handle_event(&mut self, event: &PlayerEvent);
}

impl<F> PlayerEventHandler for F
where
    F: FnMut(&PlayerEvent) + Send,
{
    fn handle_event(&mut self, event: &PlayerEvent) {
        self(event)
    }
}
