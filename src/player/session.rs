//! Session driver: one task that feeds the controller
//!
//! User input, media events, fetch outcomes and an optional clock tick are
//! joined with `tokio::select!` so the controller only ever runs on this task.

use super::controller::PlaybackController;
use super::input::{InputEvent, Key, PlayerCommand};
use super::state::PlaybackState;
use super::{PlaybackPhase, Quality};
use crate::utils::error::{PlayerError, Result};

use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// How long a finished session waits for progress deliveries
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Something for the session to act on
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Input(InputEvent),
    Command(PlayerCommand),
    Shutdown,
}

impl SessionInput {
    /// Parse one console line
    ///
    /// Key names (`space`, `left`, `right`, `up`, `down`, `m`, `f`, `esc`)
    /// become key presses; `seek <pct>`, `q <label>`, `rate <r>`,
    /// `sub <lang|off>`, `settings`, `retry` and `quit` are commands.
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return Err(PlayerError::InvalidInput("Empty command".to_string()));
        };
        let arg = parts.next();

        let input = match (word.to_ascii_lowercase().as_str(), arg) {
            ("quit" | "exit", None) => SessionInput::Shutdown,
            ("retry", None) => SessionInput::Command(PlayerCommand::Retry),
            ("settings", None) => SessionInput::Command(PlayerCommand::ToggleSettings),
            ("seek", Some(pct)) => {
                let pct = parse_number(pct)?;
                SessionInput::Input(InputEvent::ProgressBarClick { x: pct, width: 100.0 })
            }
            ("q" | "quality", Some(label)) => {
                SessionInput::Command(PlayerCommand::SetQuality(Quality::from_label(label)))
            }
            ("rate", Some(rate)) => SessionInput::Command(PlayerCommand::SetPlaybackRate(parse_number(rate)?)),
            ("sub", Some("off")) => SessionInput::Command(PlayerCommand::SelectSubtitle(None)),
            ("sub", Some(language)) => {
                SessionInput::Command(PlayerCommand::SelectSubtitle(Some(language.to_string())))
            }
            (name, None) => match Key::from_name(name) {
                Key::Other => return Err(PlayerError::InvalidInput(format!("Unknown command '{}'", line.trim()))),
                key => SessionInput::Input(InputEvent::KeyPressed(key)),
            },
            _ => return Err(PlayerError::InvalidInput(format!("Unknown command '{}'", line.trim()))),
        };
        Ok(input)
    }
}

fn parse_number(text: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|_| PlayerError::InvalidInput(format!("'{}' is not a number", text)))
}

struct Clock {
    period: Duration,
    on_tick: Box<dyn FnMut(Duration) + Send>,
}

/// Runs a controller until shutdown
pub struct PlayerSession {
    controller: PlaybackController,
    inputs: mpsc::UnboundedReceiver<SessionInput>,
    clock: Option<Clock>,
    exit_on_end: bool,
}

impl PlayerSession {
    pub fn new(controller: PlaybackController, inputs: mpsc::UnboundedReceiver<SessionInput>) -> Self {
        Self {
            controller,
            inputs,
            clock: None,
            exit_on_end: false,
        }
    }

    /// Call `on_tick` every `period`, e.g. to drive a simulated element
    pub fn with_clock<F>(mut self, period: Duration, on_tick: F) -> Self
    where
        F: FnMut(Duration) + Send + 'static,
    {
        self.clock = Some(Clock {
            period,
            on_tick: Box::new(on_tick),
        });
        self
    }

    /// Stop once playback reaches the end of the stream
    pub fn exit_on_end(mut self, exit: bool) -> Self {
        self.exit_on_end = exit;
        self
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController {
        &mut self.controller
    }

    /// Drive the controller; returns the final state after teardown
    pub async fn run(mut self) -> PlaybackState {
        let mut ticker = self.clock.as_ref().map(|clock| {
            let mut ticker = interval(clock.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(SessionInput::Shutdown) | None => {
                        info!("Session shutdown requested");
                        break;
                    }
                    Some(SessionInput::Input(event)) => {
                        if let Err(e) = self.controller.handle_input(event) {
                            warn!("Input rejected: {}", e);
                        }
                    }
                    Some(SessionInput::Command(command)) => {
                        debug!("Executing {:?}", command);
                        if let Err(e) = self.controller.execute(command) {
                            warn!("Command rejected: {}", e);
                        }
                    }
                },
                Some(message) = self.controller.next_message() => {
                    self.controller.handle_message(message);
                    if self.exit_on_end && self.controller.state().phase == PlaybackPhase::Ended {
                        info!("End of stream, closing session");
                        break;
                    }
                }
                _ = next_tick(&mut ticker) => {
                    if let Some(clock) = self.clock.as_mut() {
                        (clock.on_tick)(clock.period);
                    }
                    self.controller.tick();
                }
            }
        }

        let state = self.controller.state().clone();
        self.controller.finish(SHUTDOWN_GRACE).await;
        state
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
