//! Aggregator service - orchestrates the catalogs
//!
//! This is the high-level API the CLI uses:
//! 1. `get_tracks` - first source (in fallback order) that returns anything wins
//! 2. `create_mixed_playlist` - ask every available source, concatenate, shuffle
//! 3. `get_next_track` - walk the current playlist, topping it up in the background
//!
//! Budgets are reserved before every adapter call and only charged when the
//! call returned tracks. None of the operations fail: exhausted or broken
//! sources just mean fewer (or zero) tracks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::archive::ArchiveClient;
use super::budget::{BudgetStatus, RateBudgetTracker};
use super::cache::{CacheKey, TrackCache};
use super::domain::{CatalogError, SourceKind, Track};
use super::freesound::FreesoundClient;
use super::http::build_client;
use super::jamendo::JamendoClient;
use super::playlist::{Playlist, fisher_yates};
use super::traits::SourceAdapter;
use super::youtube::YouTubeClient;
use crate::clock::{self, Clock};
use crate::config::Config;
use crate::store::{MetadataStore, StoredTrack};

/// One adapter per catalog.
///
/// A struct rather than a map so every `SourceKind` is guaranteed an adapter.
#[derive(Clone)]
pub struct SourceSet {
    pub jamendo: Arc<dyn SourceAdapter>,
    pub freesound: Arc<dyn SourceAdapter>,
    pub archive: Arc<dyn SourceAdapter>,
    pub youtube: Arc<dyn SourceAdapter>,
}

impl SourceSet {
    /// Real clients sharing one HTTP client.
    pub fn from_config(http_client: reqwest::Client, config: &Config) -> Self {
        let sources = &config.sources;
        Self {
            jamendo: Arc::new(JamendoClient::new(
                http_client.clone(),
                sources.jamendo.client_id.clone(),
            )),
            freesound: Arc::new(FreesoundClient::new(
                http_client.clone(),
                sources.freesound.token.clone(),
            )),
            archive: Arc::new(ArchiveClient::new(http_client.clone())),
            youtube: Arc::new(YouTubeClient::new(
                http_client,
                sources.youtube.api_keys.clone(),
            )),
        }
    }

    pub fn get(&self, kind: SourceKind) -> &Arc<dyn SourceAdapter> {
        match kind {
            SourceKind::Jamendo => &self.jamendo,
            SourceKind::Freesound => &self.freesound,
            SourceKind::Archive => &self.archive,
            SourceKind::YouTube => &self.youtube,
        }
    }
}

/// Tunables for the aggregator
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Order sources are tried in; duplicates are ignored
    pub fallback_order: Vec<SourceKind>,
    /// Per-source count when `get_next_track` has to build a playlist
    pub default_tracks_per_source: usize,
    /// How many tracks a background top-up asks for
    pub replenish_batch: usize,
    /// Top up when the cursor is this close to the end (0 = never)
    pub lookahead_threshold: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            fallback_order: SourceKind::ALL.to_vec(),
            default_tracks_per_source: 10,
            replenish_batch: 20,
            lookahead_threshold: 5,
        }
    }
}

impl AggregatorConfig {
    fn normalized(mut self) -> Self {
        let mut seen = Vec::with_capacity(self.fallback_order.len());
        self.fallback_order.retain(|kind| {
            if seen.contains(kind) {
                false
            } else {
                seen.push(*kind);
                true
            }
        });
        self
    }
}

/// Search results from one source.
#[derive(Debug, Clone)]
pub struct SearchGroup {
    pub source: SourceKind,
    pub tracks: Vec<Track>,
}

/// Outcome of probing one source directly.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub source: SourceKind,
    pub track_count: usize,
    pub sample: Option<Track>,
    pub elapsed: Duration,
}

impl ProbeReport {
    pub fn ok(&self) -> bool {
        self.track_count > 0
    }
}

struct Inner {
    sources: SourceSet,
    budgets: Arc<RateBudgetTracker>,
    cache: TrackCache,
    config: AggregatorConfig,
    playlist: Mutex<Playlist>,
    replenishing: AtomicBool,
}

/// Multi-source track aggregator. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AggregatorService {
    inner: Arc<Inner>,
}

impl AggregatorService {
    pub fn new(
        sources: SourceSet,
        budgets: Arc<RateBudgetTracker>,
        cache: TrackCache,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sources,
                budgets,
                cache,
                config: config.normalized(),
                playlist: Mutex::new(Playlist::default()),
                replenishing: AtomicBool::new(false),
            }),
        }
    }

    /// Build the production service (real clients, system clock) from config.
    pub fn from_config(config: &Config) -> Result<Self, CatalogError> {
        let clock: Arc<dyn Clock> = clock::system();
        let http_client = build_client(Duration::from_secs(
            config.aggregator.request_timeout_secs.max(1),
        ))?;

        let sources = SourceSet::from_config(http_client, config);
        let budgets = Arc::new(RateBudgetTracker::new(&config.rate_limits, clock.clone()));
        let cache = TrackCache::new(
            config.cache.enabled,
            config.cache.max_size,
            config.cache.ttl_ms,
            clock,
        );
        let aggregator = AggregatorConfig {
            fallback_order: config.sources.fallback_order.clone(),
            default_tracks_per_source: config.aggregator.default_tracks_per_source,
            replenish_batch: config.aggregator.replenish_batch,
            lookahead_threshold: config.aggregator.lookahead_threshold,
        };

        Ok(Self::new(sources, budgets, cache, aggregator))
    }

    pub fn fallback_order(&self) -> &[SourceKind] {
        &self.inner.config.fallback_order
    }

    /// Tracks from the first source that has any.
    ///
    /// Exhausted sources are skipped without being called. Only the source
    /// that produced the result is charged. Empty when every source is
    /// exhausted or came back empty, or when `limit` is 0.
    pub async fn get_tracks(&self, limit: usize, offset: usize) -> Vec<Track> {
        self.first_success(limit, offset, true).await
    }

    /// `get_tracks` with the cache read optional. The result is always cached.
    async fn first_success(&self, limit: usize, offset: usize, read_cache: bool) -> Vec<Track> {
        if limit == 0 {
            return Vec::new();
        }

        let key = CacheKey::tracks(limit, offset);
        if read_cache {
            if let Some(hit) = self.inner.cache.get(&key) {
                debug!(target: "catalog::aggregator", limit, offset, "Cache hit");
                return hit;
            }
        }

        for &kind in &self.inner.config.fallback_order {
            let Some(reservation) = self.inner.budgets.try_reserve(kind) else {
                info!(target: "catalog::aggregator", source = %kind, "Source is rate limited, trying next");
                continue;
            };

            let tracks = self.inner.sources.get(kind).fetch_tracks(limit, offset).await;
            let tracks = with_identity(tracks);
            if tracks.is_empty() {
                debug!(target: "catalog::aggregator", source = %kind, "No tracks, trying next");
                continue;
            }

            reservation.commit();
            info!(
                target: "catalog::aggregator",
                source = %kind,
                count = tracks.len(),
                "Fetched tracks"
            );
            self.inner.cache.put(key, tracks.clone());
            return tracks;
        }

        warn!(target: "catalog::aggregator", "All sources failed or are rate limited");
        Vec::new()
    }

    /// Ask every available source for `tracks_per_source` tracks, shuffle the
    /// lot once, and make it the current playlist (cursor back to 0).
    ///
    /// A count of 0 asks nobody and leaves the current playlist alone.
    pub async fn create_mixed_playlist(&self, tracks_per_source: usize) -> Vec<Track> {
        if tracks_per_source == 0 {
            return Vec::new();
        }

        let mut all = Vec::new();

        for &kind in &self.inner.config.fallback_order {
            let Some(reservation) = self.inner.budgets.try_reserve(kind) else {
                debug!(target: "catalog::aggregator", source = %kind, "Skipping rate limited source");
                continue;
            };

            let tracks = with_identity(
                self.inner
                    .sources
                    .get(kind)
                    .fetch_tracks(tracks_per_source, 0)
                    .await,
            );
            if tracks.is_empty() {
                continue;
            }

            reservation.commit();
            debug!(target: "catalog::aggregator", source = %kind, count = tracks.len(), "Added to mix");
            all.extend(tracks);
        }

        fisher_yates(&mut all, &mut rand::rng());

        info!(target: "catalog::aggregator", count = all.len(), "Mixed playlist created");
        *self.inner.playlist.lock() = Playlist::new(all.clone());
        all
    }

    /// Next track of the current playlist, building one first if needed.
    ///
    /// Near the end of the list a background fetch appends more tracks; its
    /// result shows up on later calls. `None` only when no source produced
    /// anything at all.
    pub async fn get_next_track(&self) -> Option<Track> {
        let needs_build = self.inner.playlist.lock().is_empty();
        if needs_build {
            self.create_mixed_playlist(self.inner.config.default_tracks_per_source)
                .await;
        }

        let (track, replenish_from) = {
            let mut playlist = self.inner.playlist.lock();
            let Some(track) = playlist.advance() else {
                warn!(target: "catalog::aggregator", "No tracks available from any source");
                return None;
            };
            let replenish_from = playlist
                .needs_replenish(self.inner.config.lookahead_threshold)
                .then(|| playlist.len());
            (track, replenish_from)
        };

        if let Some(offset) = replenish_from {
            self.spawn_replenish(offset);
        }

        Some(track)
    }

    /// Fire-and-forget top-up. At most one runs at a time.
    ///
    /// Reads past the cache: a cached page for this offset may belong to an
    /// earlier playlist. Tracks already in the playlist are not appended again.
    fn spawn_replenish(&self, offset: usize) {
        if self.inner.replenishing.swap(true, Ordering::AcqRel) {
            return;
        }

        let service = self.clone();
        tokio::spawn(async move {
            let _guard = ReplenishGuard(Arc::clone(&service.inner));
            let batch = service.inner.config.replenish_batch;

            let tracks = service.first_success(batch, offset, false).await;
            let mut playlist = service.inner.playlist.lock();
            let added = playlist.extend_new(tracks);
            if added == 0 {
                debug!(target: "catalog::aggregator", offset, "Look-ahead found nothing new");
                return;
            }
            debug!(target: "catalog::aggregator", added, len = playlist.len(), "Playlist extended");
        });
    }

    /// Budget snapshot for every source.
    pub fn get_rate_limit_status(&self) -> BTreeMap<SourceKind, BudgetStatus> {
        self.inner.budgets.status()
    }

    /// Search every available source, grouped by source in fallback order.
    ///
    /// Sources with no results are left out. Each source's results are
    /// cached separately.
    pub async fn search(&self, query: &str, limit_per_source: usize) -> Vec<SearchGroup> {
        let mut groups = Vec::new();
        if limit_per_source == 0 {
            return groups;
        }

        for &kind in &self.inner.config.fallback_order {
            let key = CacheKey::search(kind, query, limit_per_source);
            if let Some(hit) = self.inner.cache.get(&key) {
                groups.push(SearchGroup { source: kind, tracks: hit });
                continue;
            }

            let Some(reservation) = self.inner.budgets.try_reserve(kind) else {
                continue;
            };

            let tracks = with_identity(self.inner.sources.get(kind).search(query, limit_per_source).await);
            if tracks.is_empty() {
                continue;
            }

            reservation.commit();
            self.inner.cache.put(key, tracks.clone());
            groups.push(SearchGroup { source: kind, tracks });
        }

        groups
    }

    /// Build a mixed playlist and save every track to `store`.
    ///
    /// Per-track failures are logged and skipped.
    pub async fn sync_to_store(
        &self,
        store: &dyn MetadataStore,
        tracks_per_source: usize,
    ) -> Vec<StoredTrack> {
        let tracks = self.create_mixed_playlist(tracks_per_source).await;
        let mut saved = Vec::with_capacity(tracks.len());

        for track in &tracks {
            match store.save(track).await {
                Ok(stored) => saved.push(stored),
                Err(e) => {
                    warn!(target: "catalog::aggregator", id = %track.id, error = %e, "Failed to save track");
                }
            }
        }

        info!(
            target: "catalog::aggregator",
            saved = saved.len(),
            total = tracks.len(),
            "Synced tracks to metadata store"
        );
        saved
    }

    /// Call every adapter directly, ignoring budgets and the cache.
    pub async fn probe(&self, limit: usize) -> Vec<ProbeReport> {
        let mut reports = Vec::with_capacity(SourceKind::ALL.len());

        for kind in SourceKind::ALL {
            let started = Instant::now();
            let tracks = self.inner.sources.get(kind).fetch_tracks(limit, 0).await;
            reports.push(ProbeReport {
                source: kind,
                track_count: tracks.len(),
                sample: tracks.into_iter().next(),
                elapsed: started.elapsed(),
            });
        }

        reports
    }

    #[cfg(test)]
    fn playlist_snapshot(&self) -> Playlist {
        self.inner.playlist.lock().clone()
    }
}

/// Clears the in-flight flag even if the task bails early.
struct ReplenishGuard(Arc<Inner>);

impl Drop for ReplenishGuard {
    fn drop(&mut self) {
        self.0.replenishing.store(false, Ordering::Release);
    }
}

/// Tracks without an id can't be cached or stored; adapters shouldn't emit
/// them, but don't let one through.
fn with_identity(mut tracks: Vec<Track>) -> Vec<Track> {
    tracks.retain(Track::has_identity);
    tracks
}
