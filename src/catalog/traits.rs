//! The catalog adapter seam.
//!
//! Every external catalog is reached through [`SourceAdapter`]. Its contract
//! is "empty list on failure": transport errors, bad statuses, quota errors and
//! malformed payloads are logged here and never reach the aggregator. The
//! concrete clients keep returning `Result` so they stay testable on their own.
//!
//! Tests substitute [`mocks::MockSource`], which counts calls.

use async_trait::async_trait;
use tracing::warn;

use super::archive::ArchiveClient;
use super::domain::{CatalogError, SourceKind, Track};
use super::freesound::FreesoundClient;
use super::jamendo::JamendoClient;
use super::youtube::YouTubeClient;

/// One external catalog, normalized to [`Track`]s.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which catalog this is.
    fn kind(&self) -> SourceKind;

    /// Niche-filtered listing. Empty on any failure.
    async fn fetch_tracks(&self, limit: usize, offset: usize) -> Vec<Track>;

    /// Free-text search. Catalogs without search return nothing.
    async fn search(&self, _query: &str, _limit: usize) -> Vec<Track> {
        Vec::new()
    }
}

/// Collapse a client result into the adapter contract.
fn recover(kind: SourceKind, operation: &str, result: Result<Vec<Track>, CatalogError>) -> Vec<Track> {
    match result {
        Ok(tracks) => tracks,
        Err(e @ CatalogError::MissingCredentials(_)) => {
            tracing::debug!(target: "catalog", source = %kind, operation, "{}", e);
            Vec::new()
        }
        Err(e) => {
            warn!(target: "catalog", source = %kind, operation, error = %e, "Catalog request failed");
            Vec::new()
        }
    }
}

// Implement the adapter trait for the real clients

#[async_trait]
impl SourceAdapter for JamendoClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Jamendo
    }

    async fn fetch_tracks(&self, limit: usize, offset: usize) -> Vec<Track> {
        recover(self.kind(), "fetch", self.lofi_tracks(limit, offset).await)
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<Track> {
        recover(self.kind(), "search", self.search_tracks(query, limit).await)
    }
}

#[async_trait]
impl SourceAdapter for FreesoundClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Freesound
    }

    async fn fetch_tracks(&self, limit: usize, offset: usize) -> Vec<Track> {
        recover(self.kind(), "fetch", self.lofi_tracks(limit, offset).await)
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<Track> {
        recover(self.kind(), "search", self.search_tracks(query, limit).await)
    }
}

#[async_trait]
impl SourceAdapter for ArchiveClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Archive
    }

    async fn fetch_tracks(&self, limit: usize, offset: usize) -> Vec<Track> {
        recover(self.kind(), "fetch", self.lofi_tracks(limit, offset).await)
    }
}

#[async_trait]
impl SourceAdapter for YouTubeClient {
    fn kind(&self) -> SourceKind {
        SourceKind::YouTube
    }

    async fn fetch_tracks(&self, limit: usize, offset: usize) -> Vec<Track> {
        recover(self.kind(), "fetch", self.lofi_tracks(limit, offset).await)
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<Track> {
        recover(self.kind(), "search", self.search_tracks(query, limit).await)
    }
}

/// Mock adapters for testing.
#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::test_utils::mock_track;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Mock source backed by a fixed in-memory "remote catalog".
    ///
    /// `fetch_tracks(limit, offset)` pages through the catalog, so an empty
    /// catalog behaves like a failing source.
    pub struct MockSource {
        kind: SourceKind,
        catalog: Vec<Track>,
        delay: Option<Duration>,
        fetch_calls: AtomicUsize,
        search_calls: AtomicUsize,
        requests: Mutex<Vec<(usize, usize)>>,
    }

    impl MockSource {
        /// A source whose catalog holds `count` tracks.
        pub fn with_tracks(kind: SourceKind, count: usize) -> Self {
            Self {
                kind,
                catalog: (0..count).map(|i| mock_track(kind, i)).collect(),
                delay: None,
                fetch_calls: AtomicUsize::new(0),
                search_calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// A source that always comes back empty (down, quota spent, ...).
        pub fn empty(kind: SourceKind) -> Self {
            Self::with_tracks(kind, 0)
        }

        /// Sleep before answering, to widen race windows in tests.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn fetch_calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }

        pub fn search_calls(&self) -> usize {
            self.search_calls.load(Ordering::SeqCst)
        }

        /// Every `(limit, offset)` passed to `fetch_tracks`, in call order.
        pub fn requests(&self) -> Vec<(usize, usize)> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl SourceAdapter for MockSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch_tracks(&self, limit: usize, offset: usize) -> Vec<Track> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push((limit, offset));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.catalog.iter().skip(offset).take(limit).cloned().collect()
        }

        async fn search(&self, query: &str, limit: usize) -> Vec<Track> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            let query = query.to_lowercase();
            self.catalog
                .iter()
                .filter(|t| t.name.to_lowercase().contains(&query))
                .take(limit)
                .cloned()
                .collect()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_pages_through_catalog() {
            let mock = MockSource::with_tracks(SourceKind::Archive, 5);
            let page = mock.fetch_tracks(2, 3).await;
            assert_eq!(page.len(), 2);
            assert_eq!(page[0].id, "archive_mock3");
            assert!(mock.fetch_tracks(10, 5).await.is_empty());
            assert_eq!(mock.fetch_calls(), 2);
            assert_eq!(mock.requests(), vec![(2, 3), (10, 5)]);
        }

        #[tokio::test]
        async fn test_default_search_is_empty() {
            struct Bare;

            #[async_trait]
            impl SourceAdapter for Bare {
                fn kind(&self) -> SourceKind {
                    SourceKind::Archive
                }
                async fn fetch_tracks(&self, _limit: usize, _offset: usize) -> Vec<Track> {
                    Vec::new()
                }
            }

            assert!(Bare.search("anything", 5).await.is_empty());
        }
    }
}
