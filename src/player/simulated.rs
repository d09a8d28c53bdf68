//! Clock-driven headless media element
//!
//! `SimulatedMedia` behaves like a browser video element without decoding
//! anything: binding a source loads metadata immediately, and playback time
//! only moves when [`SimulatedMedia::advance`] is called. Clones share the
//! same element, so a driver can keep a handle after giving one to the
//! controller.

use super::media::{MediaElement, MediaEvent, MediaEventSender};
use crate::api::SubtitleTrack;
use crate::utils::error::{PlayerError, Result};
use log::{debug, trace};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct Inner {
    events: MediaEventSender,
    default_duration: f64,
    durations: HashMap<String, f64>,
    source: Option<String>,
    bound_sources: Vec<String>,
    duration: f64,
    current_time: f64,
    paused: bool,
    volume: f64,
    muted: bool,
    rate: f64,
    subtitle: Option<String>,
    released: bool,
}

impl Inner {
    fn emit(&self, event: MediaEvent) {
        if self.released {
            return;
        }
        trace!("SimulatedMedia event: {:?}", event);
        // Receiver gone means the controller was torn down.
        let _ = self.events.send(event);
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released {
            Err(PlayerError::Playback("media element was released".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Headless media element with a manual clock
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedMedia {
    /// Every source gets `default_duration` seconds unless overridden
    pub fn new(events: MediaEventSender, default_duration: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                events,
                default_duration,
                durations: HashMap::new(),
                source: None,
                bound_sources: Vec::new(),
                duration: 0.0,
                current_time: 0.0,
                paused: true,
                volume: 1.0,
                muted: false,
                rate: 1.0,
                subtitle: None,
                released: false,
            })),
        }
    }

    /// Give a specific URL its own duration
    pub fn with_duration_for(self, url: impl Into<String>, duration: f64) -> Self {
        self.inner.lock().durations.insert(url.into(), duration);
        self
    }

    /// Move the playback clock forward by wall time `elapsed`
    pub fn advance(&self, elapsed: Duration) {
        let mut inner = self.inner.lock();
        if inner.released || inner.paused || inner.source.is_none() {
            return;
        }

        let next = inner.current_time + elapsed.as_secs_f64() * inner.rate;
        if next >= inner.duration {
            inner.current_time = inner.duration;
            inner.paused = true;
            let current_time = inner.current_time;
            inner.emit(MediaEvent::TimeUpdate { current_time });
            inner.emit(MediaEvent::Pause);
            inner.emit(MediaEvent::Ended);
        } else {
            inner.current_time = next;
            inner.emit(MediaEvent::TimeUpdate { current_time: next });
        }
    }

    /// Simulate a stall
    pub fn stall(&self) {
        self.inner.lock().emit(MediaEvent::Waiting);
    }

    /// Simulate the buffer refilling after a stall
    pub fn recover(&self) {
        self.inner.lock().emit(MediaEvent::CanPlay);
    }

    /// Simulate a decode or network failure
    pub fn fail(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.paused = true;
        inner.emit(MediaEvent::Error {
            message: message.into(),
        });
    }

    pub fn source(&self) -> Option<String> {
        self.inner.lock().source.clone()
    }

    /// Every URL ever bound, in order
    pub fn bound_sources(&self) -> Vec<String> {
        self.inner.lock().bound_sources.clone()
    }

    pub fn current_time(&self) -> f64 {
        self.inner.lock().current_time
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    pub fn volume(&self) -> f64 {
        self.inner.lock().volume
    }

    pub fn is_muted(&self) -> bool {
        self.inner.lock().muted
    }

    pub fn playback_rate(&self) -> f64 {
        self.inner.lock().rate
    }

    /// Language of the attached subtitle track
    pub fn subtitle(&self) -> Option<String> {
        self.inner.lock().subtitle.clone()
    }

    pub fn is_released(&self) -> bool {
        self.inner.lock().released
    }
}

impl MediaElement for SimulatedMedia {
    fn set_source(&mut self, url: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_live()?;
        debug!("SimulatedMedia binding source {}", url);

        let duration = inner.durations.get(url).copied().unwrap_or(inner.default_duration);
        inner.source = Some(url.to_string());
        inner.bound_sources.push(url.to_string());
        inner.duration = duration;
        inner.current_time = 0.0;
        inner.paused = true;
        inner.subtitle = None;

        inner.emit(MediaEvent::LoadedMetadata { duration });
        inner.emit(MediaEvent::CanPlay);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_live()?;
        if inner.source.is_none() {
            return Err(PlayerError::Playback("no source bound".to_string()));
        }
        if inner.paused {
            inner.paused = false;
            inner.emit(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_live()?;
        if !inner.paused {
            inner.paused = true;
            inner.emit(MediaEvent::Pause);
        }
        Ok(())
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_live()?;
        let current_time = seconds.clamp(0.0, inner.duration.max(0.0));
        inner.current_time = current_time;
        inner.emit(MediaEvent::TimeUpdate { current_time });
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_live()?;
        inner.volume = volume.clamp(0.0, 1.0);
        let (volume, muted) = (inner.volume, inner.muted);
        inner.emit(MediaEvent::VolumeChange { volume, muted });
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_live()?;
        inner.muted = muted;
        let volume = inner.volume;
        inner.emit(MediaEvent::VolumeChange { volume, muted });
        Ok(())
    }

    fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_live()?;
        inner.rate = rate;
        Ok(())
    }

    fn set_subtitle(&mut self, track: Option<&SubtitleTrack>) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_live()?;
        inner.subtitle = track.map(|t| t.language.clone());
        Ok(())
    }

    fn release(&mut self) {
        let mut inner = self.inner.lock();
        inner.paused = true;
        inner.source = None;
        inner.released = true;
    }
}
