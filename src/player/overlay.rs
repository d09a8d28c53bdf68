//! Transient visibility state for the player chrome

use std::time::Duration;
use tokio::time::Instant;

/// Controls and settings panel visibility
#[derive(Debug, Clone)]
pub struct OverlayState {
    controls_visible: bool,
    settings_open: bool,
    hide_after: Duration,
    hide_deadline: Option<Instant>,
}

impl OverlayState {
    pub fn new(hide_after: Duration) -> Self {
        Self {
            controls_visible: true,
            settings_open: false,
            hide_after,
            hide_deadline: None,
        }
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn settings_open(&self) -> bool {
        self.settings_open
    }

    /// Pointer or keyboard activity: show controls and restart the hide timer
    pub fn on_activity(&mut self, now: Instant, playing: bool) {
        self.controls_visible = true;
        self.hide_deadline = playing.then(|| now + self.hide_after);
    }

    /// Pointer left the player
    pub fn on_pointer_left(&mut self, playing: bool) {
        if playing && !self.settings_open {
            self.controls_visible = false;
            self.hide_deadline = None;
        }
    }

    /// Controls stay up while paused
    pub fn on_paused(&mut self) {
        self.controls_visible = true;
        self.hide_deadline = None;
    }

    pub fn toggle_settings(&mut self) {
        self.settings_open = !self.settings_open;
        if self.settings_open {
            self.controls_visible = true;
            self.hide_deadline = None;
        }
    }

    /// Hide controls once the idle deadline has passed
    pub fn tick(&mut self, now: Instant, playing: bool) {
        if let Some(deadline) = self.hide_deadline {
            if now >= deadline {
                self.hide_deadline = None;
                if playing && !self.settings_open {
                    self.controls_visible = false;
                }
            }
        }
    }
}
