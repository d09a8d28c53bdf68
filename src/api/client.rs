//! reqwest-backed client for the streaming backend

use super::types::{ApiResponse, ContentIdentity, ProgressReport, StreamDescriptor, StreamRequest, WatchedRequest};
use super::{ProgressSink, StreamResolver};
use crate::utils::config::ApiConfig;
use crate::utils::error::{IntoPlayerError, PlayerError, Result, StreamUnavailable};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

/// API client with optional bearer authentication
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.auth_token.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .config_err("Failed to create HTTP client")?;

        info!("[ApiClient] Creating API client with base URL: {}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// Build an API URL from a path
    pub fn build_url(&self, path: impl AsRef<str>) -> String {
        let path = path.as_ref().trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Query parameters of a stream request, omitting absent values
    pub(crate) fn stream_query(request: &StreamRequest) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(episode) = &request.identity.episode_id {
            params.push(("episodeId", episode.clone()));
        }
        if let Some(quality) = request.quality.as_query() {
            params.push(("quality", quality.to_string()));
        }
        params
    }

    /// Send a request whose body we only check for success
    async fn send_expecting_success(&self, builder: RequestBuilder, context: &str) -> Result<()> {
        let response = self.authorize(builder).send().await.progress_err(context)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(PlayerError::Progress(format!("{}: status {}: {}", context, status, text)))
        }
    }
}

/// Map a non-success status to the reason the stream is unavailable
pub(crate) fn classify_status(status: StatusCode, body: &str) -> std::result::Result<(), StreamUnavailable> {
    if status.is_success() {
        return Ok(());
    }
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };
    Err(match status {
        StatusCode::NOT_FOUND => StreamUnavailable::NotFound(detail),
        StatusCode::UNAUTHORIZED | StatusCode::PAYMENT_REQUIRED | StatusCode::FORBIDDEN => {
            StreamUnavailable::Denied(detail)
        }
        _ => StreamUnavailable::Network(detail),
    })
}

/// Unwrap the response envelope around a stream descriptor
pub(crate) fn parse_stream_body(body: &str) -> std::result::Result<StreamDescriptor, StreamUnavailable> {
    let envelope: ApiResponse<StreamDescriptor> = serde_json::from_str(body)
        .map_err(|e| StreamUnavailable::InvalidResponse(e.to_string()))?;

    if !envelope.success {
        let message = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| "request was not successful".to_string());
        return Err(StreamUnavailable::InvalidResponse(message));
    }

    let descriptor = envelope
        .data
        .ok_or_else(|| StreamUnavailable::InvalidResponse("empty response from server".to_string()))?;

    if descriptor.stream_url.is_empty() {
        return Err(StreamUnavailable::InvalidResponse("missing stream URL".to_string()));
    }

    Ok(descriptor)
}

#[async_trait]
impl StreamResolver for ApiClient {
    async fn resolve(&self, request: &StreamRequest) -> std::result::Result<StreamDescriptor, StreamUnavailable> {
        let url = self.build_url(format!("content/{}/stream", request.identity.content_id));
        debug!("[ApiClient] Resolving stream {} at quality {}", request.identity, request.quality);

        let builder = self.client.get(&url).query(&Self::stream_query(request));
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| StreamUnavailable::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StreamUnavailable::Network(e.to_string()))?;

        if let Err(reason) = classify_status(status, &body) {
            warn!("[ApiClient] Stream for {} unavailable: {}", request.identity, reason);
            return Err(reason);
        }

        parse_stream_body(&body)
    }
}

#[async_trait]
impl ProgressSink for ApiClient {
    async fn report(&self, report: &ProgressReport) -> Result<()> {
        let builder = self.client.patch(self.build_url("user/watch-progress")).json(report);
        self.send_expecting_success(builder, "Updating watch progress").await
    }

    async fn mark_watched(&self, identity: &ContentIdentity) -> Result<()> {
        let body = WatchedRequest {
            content_id: &identity.content_id,
            episode_id: identity.episode_id.as_deref(),
        };
        let builder = self.client.post(self.build_url("user/watched")).json(&body);
        self.send_expecting_success(builder, "Marking content watched").await
    }
}
