use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use onflix_player::api::{ApiClient, ContentIdentity};
use onflix_player::player::{
    media_channel, LoadOptions, PlaybackController, PlayerEvent, PlayerEventHandler, PlayerSession,
    SessionInput, SimulatedMedia,
};
use onflix_player::utils::{format_time, load_config, progress_percent, Config};
use onflix_player::Quality;

/// Onflix player - plays a catalog title headlessly and reports watch progress
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Content id to play
    #[arg(value_name = "CONTENT_ID")]
    content_id: String,

    /// Episode id for series content
    #[arg(short, long)]
    episode: Option<String>,

    /// Requested quality (480p, 720p, 1080p, 4k, auto)
    #[arg(short, long)]
    quality: Option<String>,

    /// Start position in seconds
    #[arg(short, long, default_value = "0")]
    start: f64,

    /// Start playing as soon as the stream is ready
    #[arg(short, long)]
    autoplay: bool,

    /// Backend base URL, overrides the config file
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Config file to use instead of the default locations
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Duration in seconds given to the simulated stream
    #[arg(long, default_value = "600")]
    duration: f64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Clock period of the simulated element
const TICK: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => load_config()?,
    };
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }

    // Initialize logging
    let log_level = if args.debug { "debug" } else { config.general.log_level.as_str() };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting Onflix player v{}", env!("CARGO_PKG_VERSION"));
    debug!("Backend at {}", config.api.base_url);

    let api = Arc::new(ApiClient::new(&config.api)?);
    let player_config = config.player.to_player_config();

    let (media_tx, media_rx) = media_channel();
    let media = SimulatedMedia::new(media_tx, args.duration);
    let mut controller = PlaybackController::new(
        Box::new(media.clone()),
        media_rx,
        api.clone(),
        api,
        player_config,
    );
    controller.add_event_handler(Box::new(LoggingEventHandler));

    let identity = match &args.episode {
        Some(episode) => ContentIdentity::episode(args.content_id.clone(), episode.clone()),
        None => ContentIdentity::new(args.content_id.clone()),
    };
    let options = LoadOptions {
        quality: args.quality.as_deref().map(Quality::from_label),
        start_time: args.start,
        auto_play: args.autoplay.then_some(true),
    };
    controller.load(identity, options)?;

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    spawn_stdin_reader(input_tx.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = input_tx.send(SessionInput::Shutdown);
        }
    });

    let state = PlayerSession::new(controller, input_rx)
        .with_clock(TICK, move |elapsed| media.advance(elapsed))
        .exit_on_end(true)
        .run()
        .await;

    info!(
        "Stopped at {} / {} ({:.0}%)",
        format_time(state.current_time),
        format_time(state.duration),
        progress_percent(state.current_time, state.duration)
    );
    if let Some(failure) = state.error {
        error!("Last error: {}", failure.message);
    }
    Ok(())
}

/// Forward console lines to the session
fn spawn_stdin_reader(tx: mpsc::UnboundedSender<SessionInput>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match SessionInput::parse(&line) {
                    Ok(input) => {
                        if tx.send(input).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("{}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
}

/// Event handler that logs events
struct LoggingEventHandler;

impl PlayerEventHandler for LoggingEventHandler {
    fn handle_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::Ready { duration } => info!("Ready, duration {}", format_time(*duration)),
            PlayerEvent::PlaybackStarted => info!("Playback started"),
            PlayerEvent::PlaybackPaused => info!("Playback paused"),
            PlayerEvent::PositionChanged { position, duration } => {
                // Log position changes at debug level to avoid spam
                debug!("Position: {} / {}", format_time(*position), format_time(*duration));
            }
            PlayerEvent::BufferingChanged { buffering } => debug!("Buffering: {}", buffering),
            PlayerEvent::VolumeChanged { volume, muted } => {
                info!("Volume: {:.0}%{}", volume * 100.0, if *muted { " (muted)" } else { "" });
            }
            PlayerEvent::SpeedChanged { rate } => info!("Playback speed: {:.2}x", rate),
            PlayerEvent::QualityChanged { quality } => info!("Quality: {}", quality),
            PlayerEvent::SubtitleChanged { language } => {
                info!("Subtitles: {}", language.as_deref().unwrap_or("off"));
            }
            PlayerEvent::FullscreenChanged { fullscreen } => info!("Fullscreen: {}", fullscreen),
            PlayerEvent::Ended => info!("End of media reached"),
            PlayerEvent::Error { failure } => {
                error!("Player error: {}", failure.message);
                if failure.retryable {
                    info!("Type 'retry' to try again");
                }
            }
            _ => {}
        }
    }
}
