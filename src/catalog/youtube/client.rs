//! YouTube Data API client
//!
//! A search costs 100 quota units, so a single key runs out quickly. The
//! client holds several keys and moves to the next one whenever the current
//! key reports a quota error. The failing call is NOT retried with the new
//! key; the aggregator moves on to its next source instead.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use super::{adapter, dto};
use crate::catalog::domain::{CatalogError, SourceKind, Track};

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

const LOFI_QUERY: &str = "lofi hip hop beats to relax study";

/// search.list caps maxResults at 50
const MAX_RESULTS: usize = 50;

/// YouTube API client with round-robin key rotation
pub struct YouTubeClient {
    http_client: reqwest::Client,
    base_url: String,
    api_keys: Vec<String>,
    key_index: AtomicUsize,
}

impl YouTubeClient {
    pub fn new(http_client: reqwest::Client, api_keys: Vec<String>) -> Self {
        Self {
            http_client,
            base_url: BASE_URL.to_string(),
            api_keys: api_keys.into_iter().filter(|k| !k.is_empty()).collect(),
            key_index: AtomicUsize::new(0),
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>, api_keys: &[&str]) -> Self {
        let http_client = crate::catalog::http::build_client(crate::catalog::http::DEFAULT_TIMEOUT)
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: base_url.into(),
            api_keys: api_keys.iter().map(|k| k.to_string()).collect(),
            key_index: AtomicUsize::new(0),
        }
    }

    /// Index of the key the next request will use.
    pub fn current_key_index(&self) -> usize {
        match self.api_keys.len() {
            0 => 0,
            n => self.key_index.load(Ordering::Relaxed) % n,
        }
    }

    /// The key to use plus the raw rotation counter it was read at.
    fn current_key(&self) -> Result<(usize, &str), CatalogError> {
        let missing = CatalogError::MissingCredentials(SourceKind::YouTube);
        if self.api_keys.is_empty() {
            return Err(missing);
        }
        let observed = self.key_index.load(Ordering::Acquire);
        self.api_keys
            .get(observed % self.api_keys.len())
            .map(|key| (observed, key.as_str()))
            .ok_or(missing)
    }

    /// Step past the key read at `observed`. Concurrent failures on the same
    /// key rotate once, so no key is skipped.
    fn rotate_from(&self, observed: usize) -> bool {
        self.api_keys.len() > 1
            && self
                .key_index
                .compare_exchange(
                    observed,
                    observed.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
    }

    /// Medium-length lofi videos by relevance.
    ///
    /// search.list pages by token, not offset, so `offset` is not used.
    pub async fn lofi_tracks(&self, limit: usize, _offset: usize) -> Result<Vec<Track>, CatalogError> {
        self.search_request(LOFI_QUERY, limit).await
    }

    pub async fn search_tracks(&self, term: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        self.search_request(&format!("{term} lofi hip hop"), limit).await
    }

    async fn search_request(&self, q: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        let (observed, key) = self.current_key()?;
        let query = [
            ("key", key.to_string()),
            ("part", "snippet".to_string()),
            ("q", q.to_string()),
            ("type", "video".to_string()),
            ("maxResults", limit.clamp(1, MAX_RESULTS).to_string()),
            ("order", "relevance".to_string()),
            ("videoDuration", "medium".to_string()),
        ];

        let response = self
            .http_client
            .get(format!("{}/search", self.base_url))
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice::<dto::SearchResponse>(&bytes);

        // Error bodies carry the reason we need for rotation, so look at them
        // before the status code.
        if let Ok(dto::SearchResponse { error: Some(error), .. }) = &body {
            let message = adapter::error_message(error);
            if adapter::is_quota_error(error, status.as_u16()) {
                self.on_quota_exhausted(observed, &message);
                return Err(CatalogError::QuotaExceeded(message));
            }
            return Err(CatalogError::Api(message));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let message = "HTTP 429".to_string();
            self.on_quota_exhausted(observed, &message);
            return Err(CatalogError::QuotaExceeded(message));
        }

        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = body.map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(adapter::to_tracks(body))
    }

    fn on_quota_exhausted(&self, observed: usize, message: &str) {
        let exhausted = observed % self.api_keys.len().max(1);
        if !self.rotate_from(observed) {
            debug!(target: "catalog::youtube", exhausted_key = exhausted, "Key already rotated");
            return;
        }
        warn!(
            target: "catalog::youtube",
            exhausted_key = exhausted,
            next_key = self.current_key_index(),
            "API key quota exhausted, rotating: {}", message
        );
    }
}
