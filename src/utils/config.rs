//! Configuration management for the Onflix player
//!
//! This module handles loading and managing application configuration
//! from config files and environment variables.

use crate::player::{PlayerConfig, Quality};
use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API configuration
    pub api: ApiConfig,

    /// Player behaviour
    pub player: PlayerSettings,

    /// General application settings
    pub general: GeneralConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST backend, e.g. `http://localhost:8080/api/v1`
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Bearer token sent with every request
    pub auth_token: Option<String>,
}

/// Player settings as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Start playing as soon as the stream is ready
    pub auto_play: bool,

    /// Initial volume (0.0 - 1.0)
    pub default_volume: f64,

    /// Arrow-key seek step in seconds
    pub seek_step_secs: f64,

    /// Arrow-key volume step
    pub volume_step: f64,

    /// Minimum spacing between progress reports
    pub progress_interval_secs: u64,

    /// Idle time before the controls overlay hides during playback
    pub controls_hide_secs: u64,

    /// Quality requested on first load
    pub default_quality: String,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            timeout_secs: 30,
            auth_token: None,
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        let player = PlayerConfig::default();
        Self {
            auto_play: player.auto_play,
            default_volume: player.default_volume,
            seek_step_secs: player.seek_step,
            volume_step: player.volume_step,
            progress_interval_secs: player.progress_interval.as_secs(),
            controls_hide_secs: player.controls_hide_after.as_secs(),
            default_quality: player.default_quality.to_string(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl PlayerSettings {
    /// Convert the on-disk settings into the controller configuration
    pub fn to_player_config(&self) -> PlayerConfig {
        PlayerConfig {
            auto_play: self.auto_play,
            default_volume: self.default_volume,
            seek_step: self.seek_step_secs,
            volume_step: self.volume_step,
            progress_interval: Duration::from_secs(self.progress_interval_secs),
            controls_hide_after: Duration::from_secs(self.controls_hide_secs),
            default_quality: Quality::from_label(&self.default_quality),
        }
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/onflix-player/config.toml on Linux)
    /// 3. User config file (~/.config/onflix-player/config.toml on Linux)
    /// 4. Environment variables (ONFLIX_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config = Self::read_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config = Self::read_file(&user_path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from an explicit file, then apply env overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the given path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).config_err("Failed to create config directory")?;
        }

        let toml = toml::to_string_pretty(self).config_err("Failed to serialize config")?;
        std::fs::write(path, toml).config_err("Failed to write config file")?;

        Ok(())
    }

    /// Parse a TOML file. Missing keys fall back to defaults.
    fn read_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).config_err("Failed to read config file")?;
        toml::from_str(&contents).config_err("Failed to parse config file")
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("ONFLIX_API_URL") {
            self.api.base_url = url;
        }

        if let Ok(token) = std::env::var("ONFLIX_API_TOKEN") {
            self.api.auth_token = Some(token);
        }

        if let Ok(volume) = std::env::var("ONFLIX_PLAYER_VOLUME") {
            self.player.default_volume = volume
                .parse()
                .map_err(|_| PlayerError::Config("Invalid ONFLIX_PLAYER_VOLUME".to_string()))?;
        }

        if let Ok(interval) = std::env::var("ONFLIX_PROGRESS_INTERVAL") {
            self.player.progress_interval_secs = interval
                .parse()
                .map_err(|_| PlayerError::Config("Invalid ONFLIX_PROGRESS_INTERVAL".to_string()))?;
        }

        if let Ok(log_level) = std::env::var("ONFLIX_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(PlayerError::Config(format!(
                "API base URL must be http(s), got '{}'",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(PlayerError::Config("API timeout must be non-zero".to_string()));
        }

        if !(0.0..=1.0).contains(&self.player.default_volume) {
            return Err(PlayerError::Config("Default volume must be between 0.0 and 1.0".to_string()));
        }

        if !self.player.seek_step_secs.is_finite() || self.player.seek_step_secs <= 0.0 {
            return Err(PlayerError::Config("Seek step must be positive".to_string()));
        }

        let step = self.player.volume_step;
        if !step.is_finite() || step <= 0.0 || step > 1.0 {
            return Err(PlayerError::Config("Volume step must be in (0.0, 1.0]".to_string()));
        }

        if self.player.progress_interval_secs == 0 {
            return Err(PlayerError::Config("Progress interval must be non-zero".to_string()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(PlayerError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level, valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/onflix-player/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA")
            .ok()
            .map(|p| PathBuf::from(p).join("OnflixPlayer").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/OnflixPlayer/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("onflix-player").join("config.toml"))
    }
}
