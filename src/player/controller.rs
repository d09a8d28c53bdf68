//! Playback controller implementation
//!
//! The controller owns the media element and is the only thing that touches
//! it. Everything that happens to a session arrives as one of three inputs:
//! a user command (method call), a media event, or the outcome of a stream
//! descriptor fetch. Fetches run on the tokio runtime and come back tagged
//! with a ticket; any outcome whose ticket is no longer current is dropped.

use super::input::{map_input, InputEvent, PlayerCommand};
use super::media::{MediaElement, MediaEvent, MediaEventReceiver};
use super::overlay::OverlayState;
use super::progress::ProgressReporter;
use super::state::{Effect, PlaybackState, ResumePoint};
use super::{
    FailureKind, PlaybackFailure, PlaybackPhase, PlayerConfig, PlayerEvent, PlayerEventHandler,
    Quality, PLAYBACK_RATES,
};
use crate::api::{
    ContentIdentity, ProgressReport, ProgressSink, StreamDescriptor, StreamRequest, StreamResolver,
    SubtitleTrack,
};
use crate::utils::error::{PlayerError, Result, StreamUnavailable};

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Options for starting playback of a new identity
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Quality to request; the configured default when `None`
    pub quality: Option<Quality>,

    /// Position to seek to once metadata is known
    pub start_time: f64,

    /// Overrides the configured autoplay flag
    pub auto_play: Option<bool>,
}

/// Why a descriptor was requested
#[derive(Debug, Clone, PartialEq)]
enum FetchPurpose {
    /// Mount, identity change or retry
    Load { quality: Quality, resume: ResumePoint },

    /// Quality change on a bound stream
    Switch { quality: Quality, resume: ResumePoint },
}

impl FetchPurpose {
    fn quality(&self) -> &Quality {
        match self {
            FetchPurpose::Load { quality, .. } | FetchPurpose::Switch { quality, .. } => quality,
        }
    }

    fn resume(&self) -> &ResumePoint {
        match self {
            FetchPurpose::Load { resume, .. } | FetchPurpose::Switch { resume, .. } => resume,
        }
    }

    fn resume_mut(&mut self) -> &mut ResumePoint {
        match self {
            FetchPurpose::Load { resume, .. } | FetchPurpose::Switch { resume, .. } => resume,
        }
    }
}

#[derive(Debug)]
struct PendingFetch {
    ticket: u64,
    purpose: FetchPurpose,
}

/// Result of a spawned descriptor fetch
#[derive(Debug)]
pub struct FetchOutcome {
    ticket: u64,
    result: std::result::Result<StreamDescriptor, StreamUnavailable>,
}

/// Anything the controller reacts to besides direct commands
#[derive(Debug)]
pub enum ControllerMessage {
    Media(MediaEvent),
    Fetched(FetchOutcome),
}

/// Coordinates one media element against the backend
pub struct PlaybackController {
    media: Box<dyn MediaElement>,
    media_events: MediaEventReceiver,
    resolver: Arc<dyn StreamResolver>,
    reporter: ProgressReporter,
    config: PlayerConfig,
    state: PlaybackState,
    overlay: OverlayState,
    identity: Option<ContentIdentity>,
    descriptor: Option<StreamDescriptor>,
    fetch_tx: mpsc::UnboundedSender<FetchOutcome>,
    fetch_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    ticket: u64,
    pending: Option<PendingFetch>,
    fetches: JoinSet<()>,
    handlers: Vec<Box<dyn PlayerEventHandler>>,
    mounted: bool,
    focused: bool,
}

impl PlaybackController {
    /// Mount a controller on `media`, whose events arrive on `media_events`
    pub fn new(
        media: Box<dyn MediaElement>,
        media_events: MediaEventReceiver,
        resolver: Arc<dyn StreamResolver>,
        sink: Arc<dyn ProgressSink>,
        config: PlayerConfig,
    ) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let state = PlaybackState {
            volume: config.default_volume.clamp(0.0, 1.0),
            ..PlaybackState::default()
        };

        let mut controller = Self {
            media,
            media_events,
            resolver,
            reporter: ProgressReporter::new(sink, config.progress_interval),
            overlay: OverlayState::new(config.controls_hide_after),
            config,
            state,
            identity: None,
            descriptor: None,
            fetch_tx,
            fetch_rx,
            ticket: 0,
            pending: None,
            fetches: JoinSet::new(),
            handlers: Vec::new(),
            mounted: true,
            focused: true,
        };

        let volume = controller.state.volume;
        if let Err(e) = controller.media.set_volume(volume) {
            warn!("Could not apply initial volume: {}", e);
        }
        controller.reporter.start();
        controller
    }

    /// Add event handler
    pub fn add_event_handler(&mut self, handler: Box<dyn PlayerEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Currently bound descriptor
    pub fn descriptor(&self) -> Option<&StreamDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn identity(&self) -> Option<&ContentIdentity> {
        self.identity.as_ref()
    }

    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether a descriptor fetch is outstanding
    pub fn is_fetching(&self) -> bool {
        self.pending.is_some()
    }

    /// Keyboard input is only honoured while focused
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    // === Session lifecycle ===

    /// Start a session for `identity`, resetting everything about the previous one
    pub fn load(&mut self, identity: ContentIdentity, options: LoadOptions) -> Result<()> {
        self.ensure_mounted()?;
        info!("Loading {}", identity);

        if self.state.playing {
            if let Err(e) = self.media.pause() {
                warn!("Pausing previous stream failed: {}", e);
            }
        }
        // Events from the previous source must not leak into the new session.
        while self.media_events.try_recv().is_ok() {}

        let quality = options.quality.unwrap_or_else(|| self.config.default_quality.clone());
        let resume = ResumePoint {
            position: options.start_time.max(0.0),
            play: options.auto_play.unwrap_or(self.config.auto_play),
        };

        self.state = self.state.reset_keeping_preferences();
        self.state.quality = quality.clone();
        self.descriptor = None;
        self.identity = Some(identity.clone());
        self.reporter.start();
        self.dispatch(PlayerEvent::Reset { identity });

        self.begin_fetch(FetchPurpose::Load { quality, resume })
    }

    /// Switch to another quality, keeping position and play/pause intent
    pub fn set_quality(&mut self, quality: Quality) -> Result<()> {
        self.ensure_mounted()?;
        if self.identity.is_none() {
            return Err(PlayerError::InvalidInput("No content loaded".to_string()));
        }

        let purpose = match self.pending.as_ref().map(|p| &p.purpose) {
            Some(FetchPurpose::Load { resume, .. }) => FetchPurpose::Load {
                quality,
                resume: *resume,
            },
            Some(FetchPurpose::Switch { resume, .. }) => FetchPurpose::Switch {
                quality,
                resume: *resume,
            },
            None if self.descriptor.is_none() => {
                let resume = self.state.resume.take().unwrap_or(ResumePoint {
                    position: self.state.current_time,
                    play: self.config.auto_play,
                });
                self.state.quality = quality.clone();
                FetchPurpose::Load { quality, resume }
            }
            None => {
                if quality == self.state.quality {
                    return Ok(());
                }
                let resume = match (self.state.phase, self.state.resume) {
                    (PlaybackPhase::Loading, Some(resume)) => resume,
                    _ => ResumePoint {
                        position: self.state.current_time,
                        play: self.state.playing,
                    },
                };
                if self.state.playing {
                    self.media.pause()?;
                }
                info!(
                    "Switching quality {} -> {} at {:.1}s",
                    self.state.quality, quality, resume.position
                );
                FetchPurpose::Switch { quality, resume }
            }
        };

        self.begin_fetch(purpose)
    }

    /// User-initiated recovery from the current failure
    pub fn retry(&mut self) -> Result<()> {
        self.ensure_mounted()?;
        if self.identity.is_none() {
            return Err(PlayerError::InvalidInput("No content loaded".to_string()));
        }

        let Some(failure) = self.state.error.take() else {
            return Ok(());
        };
        info!("Retrying after {:?} failure", failure.kind);

        match failure.kind {
            FailureKind::StreamUnavailable => {
                let resume = self.state.resume.take().unwrap_or(ResumePoint {
                    position: self.state.current_time,
                    play: self.config.auto_play,
                });
                self.begin_fetch(FetchPurpose::Load {
                    quality: self.state.quality.clone(),
                    resume,
                })
            }
            FailureKind::Playback => {
                let resume = ResumePoint {
                    position: self.state.current_time,
                    play: true,
                };
                self.begin_fetch(FetchPurpose::Load {
                    quality: self.state.quality.clone(),
                    resume,
                })
            }
            FailureKind::QualitySwitch => Ok(()),
        }
    }

    /// Stop playback, release the media element and cancel all background work
    pub fn teardown(&mut self) {
        if !self.mounted {
            return;
        }
        info!("Tearing down playback controller");

        if self.state.playing {
            if let Err(e) = self.media.pause() {
                debug!("Pause during teardown failed: {}", e);
            }
        }
        self.media.release();
        self.reporter.stop();
        self.fetches.abort_all();
        self.pending = None;
        self.ticket += 1;
        self.mounted = false;

        self.state.playing = false;
        self.state.buffering = false;
        self.state.phase = PlaybackPhase::Idle;
        while self.media_events.try_recv().is_ok() {}
    }

    /// Let pending progress deliveries finish within `grace`, then tear down
    pub async fn finish(&mut self, grace: Duration) {
        if tokio::time::timeout(grace, self.reporter.flush()).await.is_err() {
            warn!("Progress deliveries still pending after {:?}, aborting", grace);
        }
        self.teardown();
    }

    // === Playback commands ===

    /// Start or resume playback
    ///
    /// While a source swap is pending this only records the intent; the new
    /// source starts once it is ready.
    pub fn play(&mut self) -> Result<()> {
        self.ensure_mounted()?;
        if self.defer_play_intent(true) {
            return Ok(());
        }
        self.ensure_loaded()?;
        if let Some(failure) = &self.state.error {
            if failure.kind == FailureKind::Playback {
                return Err(PlayerError::Playback(
                    "playback halted after an error; retry to resume".to_string(),
                ));
            }
        }
        if self.state.playing {
            return Ok(());
        }
        if self.state.phase == PlaybackPhase::Ended {
            self.media.set_current_time(0.0)?;
            self.state.current_time = 0.0;
        }
        self.media.play()
    }

    /// Pause playback
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_mounted()?;
        if self.defer_play_intent(false) {
            return Ok(());
        }
        if !self.state.playing {
            return Ok(());
        }
        self.media.pause()
    }

    /// Toggle play/pause
    pub fn toggle_play(&mut self) -> Result<()> {
        if self.intends_to_play() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Absolute seek, clamped to `[0, duration]`
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        self.ensure_mounted()?;
        if !seconds.is_finite() {
            return Err(PlayerError::InvalidInput(format!("Invalid seek target {}", seconds)));
        }

        match self.state.phase {
            PlaybackPhase::Idle => Err(PlayerError::InvalidInput("No media loaded".to_string())),
            PlaybackPhase::Loading => {
                // Duration unknown yet: remember where to land.
                let target = seconds.max(0.0);
                if let Some(resume) = self.state.resume.as_mut() {
                    resume.position = target;
                }
                if let Some(pending) = self.pending.as_mut() {
                    pending.purpose.resume_mut().position = target;
                }
                self.state.current_time = target;
                Ok(())
            }
            _ => {
                let target = self.state.clamp_position(seconds);
                self.media.set_current_time(target)?;
                self.state.current_time = target;
                if self.state.phase == PlaybackPhase::Ended && target < self.state.duration {
                    self.state.phase = PlaybackPhase::Paused;
                }
                if let Some(pending) = self.pending.as_mut() {
                    pending.purpose.resume_mut().position = target;
                }
                debug!("Seeked to {:.1}s", target);
                self.dispatch(PlayerEvent::PositionChanged {
                    position: target,
                    duration: self.state.duration,
                });
                Ok(())
            }
        }
    }

    /// Seek by a relative amount (negative for backward)
    pub fn seek_relative(&mut self, delta: f64) -> Result<()> {
        self.seek(self.state.current_time + delta)
    }

    /// Set volume, clamped to `[0, 1]`
    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        self.ensure_mounted()?;
        if volume.is_nan() {
            return Err(PlayerError::InvalidInput("Volume must be a number".to_string()));
        }
        let volume = volume.clamp(0.0, 1.0);
        self.media.set_volume(volume)?;
        if volume != self.state.volume {
            self.state.volume = volume;
            self.dispatch(PlayerEvent::VolumeChanged {
                volume,
                muted: self.state.muted,
            });
        }
        Ok(())
    }

    pub fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.ensure_mounted()?;
        self.media.set_muted(muted)?;
        if muted != self.state.muted {
            self.state.muted = muted;
            self.dispatch(PlayerEvent::VolumeChanged {
                volume: self.state.volume,
                muted,
            });
        }
        Ok(())
    }

    /// Mute/unmute audio
    pub fn toggle_mute(&mut self) -> Result<()> {
        self.set_muted(!self.state.muted)
    }

    /// Set playback speed; only the menu rates are accepted
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.ensure_mounted()?;
        if !PLAYBACK_RATES.contains(&rate) {
            return Err(PlayerError::InvalidInput(format!(
                "Unsupported playback rate {}, expected one of {:?}",
                rate, PLAYBACK_RATES
            )));
        }
        self.media.set_playback_rate(rate)?;
        if rate != self.state.playback_rate {
            self.state.playback_rate = rate;
            info!("Playback speed set to: {:.2}x", rate);
            self.dispatch(PlayerEvent::SpeedChanged { rate });
        }
        Ok(())
    }

    /// Attach the subtitle track for `language`, or detach with `None`
    pub fn select_subtitle(&mut self, language: Option<&str>) -> Result<()> {
        self.ensure_mounted()?;
        let track = match language {
            None => None,
            Some(language) => {
                let descriptor = self
                    .descriptor
                    .as_ref()
                    .ok_or_else(|| PlayerError::InvalidInput("No stream bound".to_string()))?;
                let track = descriptor.subtitle(language).cloned().ok_or_else(|| {
                    PlayerError::InvalidInput(format!("No subtitle track for language '{}'", language))
                })?;
                Some(track)
            }
        };

        self.media.set_subtitle(track.as_ref())?;
        let language = track.map(|t| t.language);
        if language != self.state.active_subtitle {
            self.state.active_subtitle = language.clone();
            self.dispatch(PlayerEvent::SubtitleChanged { language });
        }
        Ok(())
    }

    /// Set fullscreen mode
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if fullscreen != self.state.fullscreen {
            self.state.fullscreen = fullscreen;
            self.dispatch(PlayerEvent::FullscreenChanged { fullscreen });
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        self.set_fullscreen(!self.state.fullscreen);
    }

    /// Run a single command
    pub fn execute(&mut self, command: PlayerCommand) -> Result<()> {
        match command {
            PlayerCommand::TogglePlay => self.toggle_play(),
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::SeekTo(seconds) => self.seek(seconds),
            PlayerCommand::SeekBy(delta) => self.seek_relative(delta),
            PlayerCommand::SetVolume(volume) => self.set_volume(volume),
            PlayerCommand::AdjustVolume(delta) => self.set_volume(self.state.volume + delta),
            PlayerCommand::ToggleMute => self.toggle_mute(),
            PlayerCommand::ToggleFullscreen => {
                self.toggle_fullscreen();
                Ok(())
            }
            PlayerCommand::ExitFullscreen => {
                self.set_fullscreen(false);
                Ok(())
            }
            PlayerCommand::SetPlaybackRate(rate) => self.set_playback_rate(rate),
            PlayerCommand::SetQuality(quality) => self.set_quality(quality),
            PlayerCommand::SelectSubtitle(language) => self.select_subtitle(language.as_deref()),
            PlayerCommand::ToggleSettings => {
                self.overlay.toggle_settings();
                Ok(())
            }
            PlayerCommand::Retry => self.retry(),
        }
    }

    /// Handle keyboard or pointer input
    pub fn handle_input(&mut self, event: InputEvent) -> Result<()> {
        if !self.mounted || !self.focused {
            return Ok(());
        }

        match event {
            InputEvent::PointerLeft => {
                self.overlay.on_pointer_left(self.state.playing);
                return Ok(());
            }
            _ => self.overlay.on_activity(Instant::now(), self.state.playing),
        }

        match map_input(&event, &self.state, &self.config) {
            Some(command) => self.execute(command),
            None => Ok(()),
        }
    }

    /// Advance time-based UI state
    pub fn tick(&mut self) {
        self.overlay.tick(Instant::now(), self.state.playing);
    }

    // === Event loop plumbing ===

    /// Wait for the next media event or fetch outcome
    ///
    /// Returns `None` once the controller has been torn down.
    pub async fn next_message(&mut self) -> Option<ControllerMessage> {
        if !self.mounted {
            return None;
        }
        tokio::select! {
            biased;
            Some(event) = self.media_events.recv() => Some(ControllerMessage::Media(event)),
            Some(outcome) = self.fetch_rx.recv() => Some(ControllerMessage::Fetched(outcome)),
            else => None,
        }
    }

    pub fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::Media(event) => self.handle_media_event(event),
            ControllerMessage::Fetched(outcome) => self.handle_fetch(outcome),
        }
    }

    /// Feed one media event through the state machine
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        if !self.mounted {
            return;
        }
        let was_playing = self.state.playing;

        for effect in self.state.apply(&event) {
            self.run_effect(effect);
        }

        if self.state.playing != was_playing {
            if self.state.playing {
                self.overlay.on_activity(Instant::now(), true);
            } else {
                self.overlay.on_paused();
            }
        }
    }

    /// Handle everything already queued, without waiting
    pub fn process_pending(&mut self) {
        while self.mounted {
            if let Ok(event) = self.media_events.try_recv() {
                self.handle_media_event(event);
            } else if let Ok(outcome) = self.fetch_rx.try_recv() {
                self.handle_fetch(outcome);
            } else {
                break;
            }
        }
    }

    /// Wait for the outstanding fetch (if any), then drain queued events
    pub async fn settle(&mut self) {
        while self.pending.is_some() {
            match self.next_message().await {
                Some(message) => self.handle_message(message),
                None => break,
            }
        }
        self.process_pending();
    }

    // === Internals ===

    /// Resume point a pending swap will apply, if any
    fn deferred_resume(&self) -> Option<&ResumePoint> {
        if let Some(pending) = &self.pending {
            return Some(pending.purpose.resume());
        }
        match self.state.phase {
            PlaybackPhase::Loading => self.state.resume.as_ref(),
            _ => None,
        }
    }

    /// Record play/pause for a source that is not bound yet. Returns false
    /// when nothing is pending and the element should be driven directly.
    fn defer_play_intent(&mut self, play: bool) -> bool {
        let mut deferred = false;
        if let Some(pending) = self.pending.as_mut() {
            pending.purpose.resume_mut().play = play;
            deferred = true;
        }
        if self.state.phase == PlaybackPhase::Loading {
            if let Some(resume) = self.state.resume.as_mut() {
                resume.play = play;
                deferred = true;
            }
        }
        if deferred {
            debug!("Deferred {} until the stream is ready", if play { "play" } else { "pause" });
        }
        deferred
    }

    fn intends_to_play(&self) -> bool {
        self.deferred_resume()
            .map_or(self.state.playing, |resume| resume.play)
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(PlayerError::InvalidInput("Controller was torn down".to_string()))
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        self.ensure_mounted()?;
        if self.state.is_loaded() {
            Ok(())
        } else {
            Err(PlayerError::InvalidInput("No media loaded".to_string()))
        }
    }

    fn begin_fetch(&mut self, purpose: FetchPurpose) -> Result<()> {
        let identity = self
            .identity
            .clone()
            .ok_or_else(|| PlayerError::InvalidInput("No content loaded".to_string()))?;

        self.ticket += 1;
        let ticket = self.ticket;
        let request = StreamRequest {
            identity,
            quality: purpose.quality().clone(),
        };

        if matches!(purpose, FetchPurpose::Load { .. }) {
            self.state.phase = PlaybackPhase::Loading;
        }
        debug!("Fetching stream descriptor for {} (ticket {})", request.identity, ticket);
        self.dispatch(PlayerEvent::Loading {
            quality: request.quality.clone(),
        });
        self.pending = Some(PendingFetch { ticket, purpose });

        let resolver = Arc::clone(&self.resolver);
        let tx = self.fetch_tx.clone();
        while self.fetches.try_join_next().is_some() {}
        self.fetches.spawn(async move {
            let result = resolver.resolve(&request).await;
            // Receiver gone means the controller was dropped.
            let _ = tx.send(FetchOutcome { ticket, result });
        });
        Ok(())
    }

    fn handle_fetch(&mut self, outcome: FetchOutcome) {
        if !self.mounted {
            return;
        }
        let pending = match self.pending.take() {
            Some(pending) if pending.ticket == outcome.ticket => pending,
            other => {
                debug!("Discarding stale stream descriptor (ticket {})", outcome.ticket);
                self.pending = other;
                return;
            }
        };

        match (pending.purpose, outcome.result) {
            (FetchPurpose::Load { quality, resume }, Ok(descriptor)) => {
                self.state.quality = quality;
                self.bind(descriptor, resume);
            }
            (FetchPurpose::Load { resume, .. }, Err(reason)) => {
                error!("Stream unavailable: {}", reason);
                self.state.phase = PlaybackPhase::Idle;
                self.state.resume = Some(resume);
                self.record_failure(PlaybackFailure::from_error(&PlayerError::from(reason)));
            }
            (FetchPurpose::Switch { quality, resume }, Ok(descriptor)) => {
                self.state.quality = quality.clone();
                self.bind(descriptor, resume);
                self.dispatch(PlayerEvent::QualityChanged { quality });
            }
            (FetchPurpose::Switch { quality, resume }, Err(reason)) => {
                warn!("Staying on {}: switch to {} failed: {}", self.state.quality, quality, reason);
                self.record_failure(PlaybackFailure::from_error(&PlayerError::QualitySwitch {
                    quality,
                    reason,
                }));
                if resume.play {
                    if let Err(e) = self.media.play() {
                        self.fail_playback(e);
                    }
                }
            }
        }
    }

    /// Make `descriptor` the active one and point the media element at it
    fn bind(&mut self, descriptor: StreamDescriptor, resume: ResumePoint) {
        info!(
            "Binding stream {} ({} qualities, {} subtitle tracks)",
            descriptor.stream_url,
            descriptor.qualities.len(),
            descriptor.subtitles.len()
        );

        let subtitle = self
            .state
            .active_subtitle
            .as_deref()
            .and_then(|language| descriptor.subtitle(language))
            .cloned();
        if self.state.active_subtitle.is_some() && subtitle.is_none() {
            self.state.active_subtitle = None;
            self.dispatch(PlayerEvent::SubtitleChanged { language: None });
        }

        self.state.phase = PlaybackPhase::Loading;
        self.state.resume = Some(resume);
        self.state.current_time = resume.position.max(0.0);
        self.state.playing = false;
        self.state.buffering = false;
        self.state.error = None;

        if let Err(e) = Self::attach_source(self.media.as_mut(), &descriptor, &self.state, subtitle.as_ref()) {
            self.descriptor = Some(descriptor);
            self.fail_playback(e);
            return;
        }

        self.descriptor = Some(descriptor.clone());
        self.dispatch(PlayerEvent::StreamBound { descriptor });
    }

    /// Swap the source and re-apply everything a swap resets
    fn attach_source(
        media: &mut dyn MediaElement,
        descriptor: &StreamDescriptor,
        state: &PlaybackState,
        subtitle: Option<&SubtitleTrack>,
    ) -> Result<()> {
        media.set_source(&descriptor.stream_url)?;
        media.set_volume(state.volume)?;
        media.set_muted(state.muted)?;
        media.set_playback_rate(state.playback_rate)?;
        media.set_subtitle(subtitle)?;
        Ok(())
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Seek(target) => {
                if let Err(e) = self.media.set_current_time(target) {
                    self.fail_playback(e);
                }
            }
            Effect::Play => {
                if let Err(e) = self.media.play() {
                    self.fail_playback(e);
                }
            }
            Effect::Emit(event) => self.dispatch(event),
            Effect::ReportProgress => {
                if let Some(identity) = &self.identity {
                    let report = ProgressReport::new(identity, self.state.current_time, self.state.duration);
                    if self.reporter.offer(report.clone()) {
                        self.dispatch(PlayerEvent::ProgressReported { report });
                    }
                }
            }
            Effect::ReportCompletion => {
                if let Some(identity) = self.identity.clone() {
                    let report = ProgressReport::new(&identity, self.state.duration, self.state.duration);
                    if self.reporter.complete(identity, report.clone()) {
                        self.dispatch(PlayerEvent::ProgressReported { report });
                    }
                }
            }
        }
    }

    fn fail_playback(&mut self, err: PlayerError) {
        error!("Playback failed: {}", err);
        self.state.playing = false;
        self.state.buffering = false;
        if self.state.phase == PlaybackPhase::Playing {
            self.state.phase = PlaybackPhase::Paused;
        }
        let err = match err {
            err @ PlayerError::Playback(_) => err,
            other => PlayerError::Playback(other.to_string()),
        };
        self.record_failure(PlaybackFailure::from_error(&err));
    }

    fn record_failure(&mut self, failure: PlaybackFailure) {
        self.state.error = Some(failure.clone());
        self.dispatch(PlayerEvent::Error { failure });
    }

    /// Send event to handlers
    fn dispatch(&mut self, event: PlayerEvent) {
        for handler in self.handlers.iter_mut() {
            handler.handle_event(&event);
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}
