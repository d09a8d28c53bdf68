//! Data exchanged with the streaming backend

use crate::player::Quality;
use serde::{Deserialize, Serialize};

/// Which piece of content a playback session is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentIdentity {
    pub content_id: String,
    pub episode_id: Option<String>,
}

impl ContentIdentity {
    pub fn new(content_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            episode_id: None,
        }
    }

    pub fn episode(content_id: impl Into<String>, episode_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            episode_id: Some(episode_id.into()),
        }
    }
}

impl std::fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.episode_id {
            Some(episode) => write!(f, "{}/{}", self.content_id, episode),
            None => f.write_str(&self.content_id),
        }
    }
}

/// Input to a stream descriptor fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub identity: ContentIdentity,
    pub quality: Quality,
}

/// One subtitle track offered for a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Language code, e.g. "en"
    pub language: String,
    pub url: String,
}

/// Playable URL plus the variants and subtitles available for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    #[serde(alias = "streaming_url")]
    pub stream_url: String,

    /// Ordered as the backend lists them
    #[serde(default)]
    pub qualities: Vec<Quality>,

    #[serde(default)]
    pub subtitles: Vec<SubtitleTrack>,
}

impl StreamDescriptor {
    pub fn subtitle(&self, language: &str) -> Option<&SubtitleTrack> {
        self.subtitles.iter().find(|t| t.language == language)
    }
}

/// Snapshot of playback position sent to the watch-progress endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub content_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    #[serde(rename = "progress")]
    pub position_seconds: f64,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
}

impl ProgressReport {
    pub fn new(identity: &ContentIdentity, position_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            content_id: identity.content_id.clone(),
            episode_id: identity.episode_id.clone(),
            position_seconds,
            duration_seconds,
        }
    }
}

/// Body of the "mark watched" call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WatchedRequest<'a> {
    pub content_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<&'a str>,
}

/// Standard response envelope used by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub data: Option<T>,
}
