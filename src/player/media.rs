//! Media element abstraction
//!
//! A media element is the thing that actually decodes and renders a stream.
//! Commands go in through [`MediaElement`]; what the element observes comes
//! back asynchronously as [`MediaEvent`]s on an unbounded channel, in the
//! order the element produced them.

use crate::api::SubtitleTrack;
use crate::utils::error::Result;
use tokio::sync::mpsc;

/// Notifications emitted by a media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Duration is known
    LoadedMetadata { duration: f64 },

    /// Playback position moved
    TimeUpdate { current_time: f64 },

    /// Element started playing
    Play,

    /// Element paused
    Pause,

    /// End of stream
    Ended,

    /// Playback stalled waiting for data
    Waiting,

    /// Enough data buffered to play
    CanPlay,

    /// Volume or mute changed
    VolumeChange { volume: f64, muted: bool },

    /// Decode or network failure
    Error { message: String },
}

pub type MediaEventSender = mpsc::UnboundedSender<MediaEvent>;
pub type MediaEventReceiver = mpsc::UnboundedReceiver<MediaEvent>;

/// Create the channel a media element reports through
pub fn media_channel() -> (MediaEventSender, MediaEventReceiver) {
    mpsc::unbounded_channel()
}

/// Commands accepted by a media element
pub trait MediaElement: Send {
    /// Replace the current source. Position resets and the element pauses.
    fn set_source(&mut self, url: &str) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Absolute seek in seconds
    fn set_current_time(&mut self, seconds: f64) -> Result<()>;

    fn set_volume(&mut self, volume: f64) -> Result<()>;

    fn set_muted(&mut self, muted: bool) -> Result<()>;

    fn set_playback_rate(&mut self, rate: f64) -> Result<()>;

    /// Attach a subtitle track, or detach with `None`
    fn set_subtitle(&mut self, track: Option<&SubtitleTrack>) -> Result<()>;

    /// Stop playback and drop the underlying resource. No events follow.
    fn release(&mut self);
}
