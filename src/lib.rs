//! Onflix player
//!
//! Headless playback controller for the Onflix streaming storefront: it
//! resolves a stream for a content/episode, drives a media element through
//! its lifecycle and reports watch progress back to the backend.

pub mod api;
pub mod player;
pub mod utils;

pub use api::{ApiClient, ContentIdentity, ProgressSink, StreamDescriptor, StreamResolver};
pub use player::{
    LoadOptions, PlaybackController, PlaybackPhase, PlaybackState, PlayerCommand, PlayerConfig,
    PlayerEvent, PlayerSession, Quality,
};
pub use utils::{Config, PlayerError, Result};
