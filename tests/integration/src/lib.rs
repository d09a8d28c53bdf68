//! Integration test utilities for the Onflix player
//!
//! This module provides the pieces the scenario tests share:
//! - A scripted stream resolver with per-content delays and failures
//! - A progress sink that records everything it is given
//! - A fixture wiring both to a controller on a simulated element

use async_trait::async_trait;
use onflix_player::api::{
    ContentIdentity, ProgressReport, ProgressSink, StreamDescriptor, StreamRequest, StreamResolver,
    SubtitleTrack,
};
use onflix_player::player::{
    media_channel, PlaybackController, PlayerConfig, PlayerEvent, SimulatedMedia,
};
use onflix_player::utils::{Result, StreamUnavailable};
use onflix_player::Quality;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Resolver whose answers are scripted per content id and quality
#[derive(Default)]
pub struct ScriptedResolver {
    delays: Mutex<HashMap<String, Duration>>,
    quality_delays: Mutex<HashMap<(String, Quality), Duration>>,
    failures: Mutex<HashMap<(String, Quality), StreamUnavailable>>,
    calls: Mutex<Vec<StreamRequest>>,
}

impl ScriptedResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Delay every answer for `content_id`
    pub fn delay(&self, content_id: &str, delay: Duration) {
        self.delays.lock().insert(content_id.to_string(), delay);
    }

    /// Delay answers for `content_id` at `quality`, overriding [`Self::delay`]
    pub fn delay_quality(&self, content_id: &str, quality: Quality, delay: Duration) {
        self.quality_delays
            .lock()
            .insert((content_id.to_string(), quality), delay);
    }

    /// Fail requests for `content_id` at `quality`
    pub fn fail(&self, content_id: &str, quality: Quality, reason: StreamUnavailable) {
        self.failures.lock().insert((content_id.to_string(), quality), reason);
    }

    pub fn heal(&self) {
        self.failures.lock().clear();
    }

    pub fn calls(&self) -> Vec<StreamRequest> {
        self.calls.lock().clone()
    }

    /// URL the resolver hands out for a request
    pub fn url_for(content_id: &str, quality: &Quality) -> String {
        format!("https://cdn.onflix.test/{}/{}.m3u8", content_id, quality)
    }
}

#[async_trait]
impl StreamResolver for ScriptedResolver {
    async fn resolve(
        &self,
        request: &StreamRequest,
    ) -> std::result::Result<StreamDescriptor, StreamUnavailable> {
        self.calls.lock().push(request.clone());
        let content_id = request.identity.content_id.clone();

        let delay = self
            .quality_delays
            .lock()
            .get(&(content_id.clone(), request.quality.clone()))
            .copied()
            .or_else(|| self.delays.lock().get(&content_id).copied());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failures
            .lock()
            .get(&(content_id.clone(), request.quality.clone()))
            .cloned();
        if let Some(reason) = failure {
            return Err(reason);
        }

        Ok(StreamDescriptor {
            stream_url: Self::url_for(&content_id, &request.quality),
            qualities: ["480p", "720p", "1080p"].iter().map(|q| Quality::from_label(q)).collect(),
            subtitles: vec![SubtitleTrack {
                language: "en".to_string(),
                url: format!("https://cdn.onflix.test/{}/en.vtt", content_id),
            }],
        })
    }
}

/// Sink that records reports and watched marks
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<ProgressReport>>,
    watched: Mutex<Vec<ContentIdentity>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<ProgressReport> {
        self.reports.lock().clone()
    }

    pub fn watched(&self) -> Vec<ContentIdentity> {
        self.watched.lock().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn report(&self, report: &ProgressReport) -> Result<()> {
        self.reports.lock().push(report.clone());
        Ok(())
    }

    async fn mark_watched(&self, identity: &ContentIdentity) -> Result<()> {
        self.watched.lock().push(identity.clone());
        Ok(())
    }
}

/// Controller on a simulated element with scripted collaborators
pub struct TestFixture {
    pub controller: PlaybackController,
    pub media: SimulatedMedia,
    pub resolver: Arc<ScriptedResolver>,
    pub sink: Arc<RecordingSink>,
    pub events: Arc<Mutex<Vec<PlayerEvent>>>,
}

impl TestFixture {
    /// Every simulated source lasts `duration` seconds
    pub fn new(duration: f64) -> Self {
        Self::with_config(duration, PlayerConfig::default())
    }

    pub fn with_config(duration: f64, config: PlayerConfig) -> Self {
        let (tx, rx) = media_channel();
        let media = SimulatedMedia::new(tx, duration);
        let resolver = ScriptedResolver::new();
        let sink = RecordingSink::new();
        let mut controller = PlaybackController::new(
            Box::new(media.clone()),
            rx,
            resolver.clone(),
            sink.clone(),
            config,
        );

        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&events);
        controller.add_event_handler(Box::new(move |event: &PlayerEvent| {
            recorded.lock().push(event.clone());
        }));

        Self {
            controller,
            media,
            resolver,
            sink,
            events,
        }
    }

    /// Advance the element clock in whole seconds, processing events after each
    pub async fn play_for(&mut self, seconds: u64) {
        for _ in 0..seconds {
            tokio::time::advance(Duration::from_secs(1)).await;
            self.media.advance(Duration::from_secs(1));
            self.controller.process_pending();
        }
    }

    /// Let spawned deliveries run
    pub async fn flush(&self) {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().clone()
    }
}
