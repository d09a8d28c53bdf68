//! Playback state and its transition function
//!
//! Every media event goes through [`PlaybackState::apply`], which updates the
//! state and returns the side effects the controller has to carry out. The
//! state itself never touches the media element.

use super::media::MediaEvent;
use super::{PlaybackFailure, PlaybackPhase, PlayerEvent, Quality};
use crate::utils::error::PlayerError;
use log::{debug, info, warn};

/// Where playback should continue once a freshly bound source is ready
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumePoint {
    pub position: f64,
    pub play: bool,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Absolute seek on the media element
    Seek(f64),

    /// Start the media element
    Play,

    /// Publish to event handlers
    Emit(PlayerEvent),

    /// Offer a throttled progress report
    ReportProgress,

    /// Send the final report and mark the content watched
    ReportCompletion,
}

/// Observable state of one playback session
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub phase: PlaybackPhase,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f64,
    pub muted: bool,
    pub playing: bool,
    pub playback_rate: f64,
    pub buffering: bool,
    pub quality: Quality,
    pub fullscreen: bool,
    pub active_subtitle: Option<String>,
    pub error: Option<PlaybackFailure>,

    /// Applied on the next metadata load
    pub(crate) resume: Option<ResumePoint>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            current_time: 0.0,
            duration: 0.0,
            volume: 1.0,
            muted: false,
            playing: false,
            playback_rate: 1.0,
            buffering: false,
            quality: Quality::Auto,
            fullscreen: false,
            active_subtitle: None,
            error: None,
            resume: None,
        }
    }
}

impl PlaybackState {
    /// Fresh state that keeps the viewer's audio and display preferences
    pub fn reset_keeping_preferences(&self) -> Self {
        Self {
            volume: self.volume,
            muted: self.muted,
            playback_rate: self.playback_rate,
            fullscreen: self.fullscreen,
            ..Self::default()
        }
    }

    /// Clamp a target position into `[0, duration]`
    pub fn clamp_position(&self, seconds: f64) -> f64 {
        if !seconds.is_finite() {
            return 0.0;
        }
        seconds.clamp(0.0, self.duration.max(0.0))
    }

    /// Whether a stream is bound and metadata is known
    pub fn is_loaded(&self) -> bool {
        matches!(
            self.phase,
            PlaybackPhase::Ready | PlaybackPhase::Playing | PlaybackPhase::Paused | PlaybackPhase::Ended
        )
    }

    /// Loading spinner visibility
    pub fn shows_spinner(&self) -> bool {
        self.phase == PlaybackPhase::Loading || self.buffering
    }

    /// Apply one media event
    pub fn apply(&mut self, event: &MediaEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            MediaEvent::LoadedMetadata { duration } => {
                self.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
                if self.phase != PlaybackPhase::Loading {
                    debug!("Duration updated to {:.1}s", self.duration);
                    return effects;
                }

                let resume = self.resume.take().unwrap_or(ResumePoint {
                    position: 0.0,
                    play: false,
                });
                let target = self.clamp_position(resume.position);
                if target > 0.0 {
                    effects.push(Effect::Seek(target));
                }
                self.current_time = target;
                self.phase = PlaybackPhase::Ready;
                info!("Stream ready: duration {:.1}s, starting at {:.1}s", self.duration, target);
                effects.push(Effect::Emit(PlayerEvent::Ready {
                    duration: self.duration,
                }));
                if resume.play {
                    effects.push(Effect::Play);
                }
            }

            MediaEvent::TimeUpdate { current_time } => {
                // Until metadata arrives the old position is what the viewer sees.
                if !self.is_loaded() {
                    return effects;
                }
                self.current_time = self.clamp_position(*current_time);
                effects.push(Effect::Emit(PlayerEvent::PositionChanged {
                    position: self.current_time,
                    duration: self.duration,
                }));
                if self.playing {
                    effects.push(Effect::ReportProgress);
                }
            }

            MediaEvent::Play => {
                if !self.is_loaded() {
                    return effects;
                }
                self.phase = PlaybackPhase::Playing;
                if !self.playing {
                    self.playing = true;
                    effects.push(Effect::Emit(PlayerEvent::PlaybackStarted));
                }
            }

            MediaEvent::Pause => {
                if self.phase == PlaybackPhase::Playing {
                    self.phase = PlaybackPhase::Paused;
                }
                if self.playing {
                    self.playing = false;
                    effects.push(Effect::Emit(PlayerEvent::PlaybackPaused));
                }
            }

            MediaEvent::Ended => {
                if !matches!(self.phase, PlaybackPhase::Playing | PlaybackPhase::Paused) {
                    return effects;
                }
                self.phase = PlaybackPhase::Ended;
                self.playing = false;
                self.current_time = self.duration;
                if self.buffering {
                    self.buffering = false;
                    effects.push(Effect::Emit(PlayerEvent::BufferingChanged { buffering: false }));
                }
                info!("Playback ended");
                effects.push(Effect::ReportCompletion);
                effects.push(Effect::Emit(PlayerEvent::Ended));
            }

            MediaEvent::Waiting => {
                if matches!(self.phase, PlaybackPhase::Playing | PlaybackPhase::Paused) && !self.buffering {
                    self.buffering = true;
                    effects.push(Effect::Emit(PlayerEvent::BufferingChanged { buffering: true }));
                }
            }

            MediaEvent::CanPlay => {
                if self.buffering {
                    self.buffering = false;
                    effects.push(Effect::Emit(PlayerEvent::BufferingChanged { buffering: false }));
                }
            }

            MediaEvent::VolumeChange { volume, muted } => {
                let volume = volume.clamp(0.0, 1.0);
                if volume != self.volume || *muted != self.muted {
                    self.volume = volume;
                    self.muted = *muted;
                    effects.push(Effect::Emit(PlayerEvent::VolumeChanged {
                        volume,
                        muted: *muted,
                    }));
                }
            }

            MediaEvent::Error { message } => {
                warn!("Media element error: {}", message);
                self.playing = false;
                self.buffering = false;
                if self.phase == PlaybackPhase::Playing {
                    self.phase = PlaybackPhase::Paused;
                }
                let failure = PlaybackFailure::from_error(&PlayerError::Playback(message.clone()));
                self.error = Some(failure.clone());
                effects.push(Effect::Emit(PlayerEvent::Error { failure }));
            }
        }

        effects
    }
}
