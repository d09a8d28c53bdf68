//! Backend collaborators of the playback controller
//!
//! The controller only needs two things from the REST backend: resolving a
//! playable stream for a content/episode/quality triple, and accepting
//! watch-progress reports. Both are traits so tests and alternative backends
//! can stand in for [`ApiClient`].

mod client;
mod types;

pub use client::ApiClient;
pub use types::{
    ApiResponse, ContentIdentity, ProgressReport, StreamDescriptor, StreamRequest, SubtitleTrack,
};

use crate::utils::error::{Result, StreamUnavailable};
use async_trait::async_trait;

/// Resolves stream descriptors
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Fetch a descriptor for the requested identity and quality
    async fn resolve(
        &self,
        request: &StreamRequest,
    ) -> std::result::Result<StreamDescriptor, StreamUnavailable>;
}

/// Receives watch-progress reports
///
/// Delivery is fire-and-forget from the controller's side: errors are
/// logged and never retried.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Persist the current position
    async fn report(&self, report: &ProgressReport) -> Result<()>;

    /// Flag the content as fully watched
    async fn mark_watched(&self, _identity: &ContentIdentity) -> Result<()> {
        Ok(())
    }
}
