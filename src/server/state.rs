use std::sync::Arc;

use super::blob::BlobStore;
use super::rate_limit::RateLimiter;
use super::repository::SongRepository;
use crate::clock::Clock;

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub songs: Arc<dyn SongRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub limiter: Arc<RateLimiter>,
    pub clock: Arc<dyn Clock>,
    pub max_upload_bytes: usize,
    /// Expose internal error text in 500 responses
    pub development: bool,
}
