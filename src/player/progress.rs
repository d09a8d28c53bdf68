//! Throttled watch-progress reporting
//!
//! [`ProgressThrottle`] is a leading-edge rate limiter: the first offer after
//! `start` goes through, later offers go through only once `interval` has
//! elapsed since the last one. Because offers arrive on every time update,
//! continuous playback produces one report per interval.
//!
//! [`ProgressReporter`] pairs the throttle with a sink. Deliveries are
//! spawned fire-and-forget and tracked so `stop` can abort them.

use crate::api::{ContentIdentity, ProgressReport, ProgressSink};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Rate limiter with an explicit start/stop lifecycle
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
    running: bool,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
        self.last_emit = None;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.last_emit = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Claim the slot for `now` if the interval has elapsed
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        let open = match self.last_emit {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if open {
            self.last_emit = Some(now);
        }
        open
    }
}

/// Delivers progress reports to a sink
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    throttle: ProgressThrottle,
    deliveries: JoinSet<()>,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>, interval: Duration) -> Self {
        Self {
            sink,
            throttle: ProgressThrottle::new(interval),
            deliveries: JoinSet::new(),
        }
    }

    pub fn start(&mut self) {
        self.throttle.start();
    }

    /// Stop throttling and abort every delivery still in flight
    pub fn stop(&mut self) {
        self.throttle.stop();
        self.deliveries.abort_all();
    }

    pub fn is_running(&self) -> bool {
        self.throttle.is_running()
    }

    /// Deliveries spawned and not yet reaped
    pub fn in_flight(&mut self) -> usize {
        while self.deliveries.try_join_next().is_some() {}
        self.deliveries.len()
    }

    /// Wait for every delivery still in flight
    pub async fn flush(&mut self) {
        while self.deliveries.join_next().await.is_some() {}
    }

    /// Send `report` if the throttle allows it. Returns whether it was sent.
    pub fn offer(&mut self, report: ProgressReport) -> bool {
        if report.duration_seconds <= 0.0 {
            return false;
        }
        if !self.throttle.try_acquire(Instant::now()) {
            return false;
        }
        self.deliver(report);
        true
    }

    /// Send the completion report and mark the content watched, bypassing the throttle
    pub fn complete(&mut self, identity: ContentIdentity, report: ProgressReport) -> bool {
        if !self.throttle.is_running() {
            return false;
        }
        self.throttle.last_emit = Some(Instant::now());

        let sink = Arc::clone(&self.sink);
        self.reap();
        self.deliveries.spawn(async move {
            if let Err(e) = sink.report(&report).await {
                warn!("Final progress report for {} dropped: {}", identity, e);
            }
            if let Err(e) = sink.mark_watched(&identity).await {
                warn!("Marking {} watched failed: {}", identity, e);
            }
        });
        true
    }

    fn deliver(&mut self, report: ProgressReport) {
        debug!(
            "Reporting progress {:.1}/{:.1}s for {}",
            report.position_seconds, report.duration_seconds, report.content_id
        );
        let sink = Arc::clone(&self.sink);
        self.reap();
        self.deliveries.spawn(async move {
            if let Err(e) = sink.report(&report).await {
                // The next interval's report supersedes this one.
                warn!("Progress report dropped: {}", e);
            }
        });
    }

    fn reap(&mut self) {
        while self.deliveries.try_join_next().is_some() {}
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("throttle", &self.throttle)
            .field("deliveries", &self.deliveries.len())
            .finish()
    }
}
