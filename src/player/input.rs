//! Input controller: keyboard and pointer gestures to player commands

use super::state::PlaybackState;
use super::{PlayerConfig, Quality};

/// Keys the player reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    M,
    F,
    Escape,
    Other,
}

impl Key {
    /// Parse a key name as typed on a console or sent by a host UI
    pub fn from_name(name: &str) -> Key {
        match name.trim().to_ascii_lowercase().as_str() {
            "space" | " " => Key::Space,
            "left" | "arrowleft" => Key::ArrowLeft,
            "right" | "arrowright" => Key::ArrowRight,
            "up" | "arrowup" => Key::ArrowUp,
            "down" | "arrowdown" => Key::ArrowDown,
            "m" | "keym" => Key::M,
            "f" | "keyf" => Key::F,
            "esc" | "escape" => Key::Escape,
            _ => Key::Other,
        }
    }
}

/// Raw user input delivered to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyPressed(Key),

    /// Click or drag on the progress bar at `x` pixels of a `width`-pixel bar
    ProgressBarClick { x: f64, width: f64 },

    /// Pointer activity over the player
    PointerMoved,

    /// Pointer left the player area
    PointerLeft,
}

/// Operations the controller can perform
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    TogglePlay,
    Play,
    Pause,
    SeekTo(f64),
    SeekBy(f64),
    SetVolume(f64),
    AdjustVolume(f64),
    ToggleMute,
    ToggleFullscreen,
    ExitFullscreen,
    SetPlaybackRate(f64),
    SetQuality(Quality),
    SelectSubtitle(Option<String>),
    ToggleSettings,
    Retry,
}

/// Map a progress-bar position linearly onto `[0, duration]`
pub fn progress_bar_target(x: f64, width: f64, duration: f64) -> f64 {
    if width <= 0.0 || !x.is_finite() || duration <= 0.0 {
        return 0.0;
    }
    (x / width).clamp(0.0, 1.0) * duration
}

/// Translate an input event into a command, if it maps to one
pub fn map_input(event: &InputEvent, state: &PlaybackState, config: &PlayerConfig) -> Option<PlayerCommand> {
    match event {
        InputEvent::KeyPressed(key) => match key {
            Key::Space => Some(PlayerCommand::TogglePlay),
            Key::ArrowLeft => Some(PlayerCommand::SeekBy(-config.seek_step)),
            Key::ArrowRight => Some(PlayerCommand::SeekBy(config.seek_step)),
            Key::ArrowUp => Some(PlayerCommand::AdjustVolume(config.volume_step)),
            Key::ArrowDown => Some(PlayerCommand::AdjustVolume(-config.volume_step)),
            Key::M => Some(PlayerCommand::ToggleMute),
            Key::F => Some(PlayerCommand::ToggleFullscreen),
            Key::Escape if state.fullscreen => Some(PlayerCommand::ExitFullscreen),
            _ => None,
        },
        InputEvent::ProgressBarClick { x, width } => Some(PlayerCommand::SeekTo(progress_bar_target(
            *x,
            *width,
            state.duration,
        ))),
        InputEvent::PointerMoved | InputEvent::PointerLeft => None,
    }
}
