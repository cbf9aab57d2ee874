//! Short-lived query cache.
//!
//! Identical catalog queries inside the TTL are answered from memory. Entries
//! expire lazily on read; the LRU bound keeps memory flat when many distinct
//! queries are made.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::domain::{SourceKind, Track};
use crate::clock::Clock;

/// Which aggregator operation produced the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    Tracks,
    Search,
}

/// Full parameter set of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub op: CacheOp,
    pub limit: usize,
    pub offset: usize,
    pub query: Option<String>,
    pub source: Option<SourceKind>,
}

impl CacheKey {
    pub fn tracks(limit: usize, offset: usize) -> Self {
        Self {
            op: CacheOp::Tracks,
            limit,
            offset,
            query: None,
            source: None,
        }
    }

    /// Searches are cached per source; the query is case-folded.
    pub fn search(source: SourceKind, query: &str, limit: usize) -> Self {
        Self {
            op: CacheOp::Search,
            limit,
            offset: 0,
            query: Some(query.trim().to_lowercase()),
            source: Some(source),
        }
    }
}

struct CacheEntry {
    tracks: Vec<Track>,
    created_at_ms: i64,
}

/// TTL + LRU cache of track lists.
pub struct TrackCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl_ms: i64,
    enabled: bool,
    clock: Arc<dyn Clock>,
}

impl TrackCache {
    pub fn new(enabled: bool, max_size: usize, ttl_ms: u64, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl_ms: i64::try_from(ttl_ms).unwrap_or(i64::MAX),
            enabled,
            clock,
        }
    }

    /// A cache that never stores anything.
    #[cfg(test)]
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self::new(false, 1, 0, clock)
    }

    /// Fresh entry for `key`, if any. Stale entries are dropped on the way.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<Track>> {
        if !self.enabled {
            return None;
        }

        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if now.saturating_sub(entry.created_at_ms) <= self.ttl_ms => {
                return Some(entry.tracks.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn put(&self, key: CacheKey, tracks: Vec<Track>) {
        if !self.enabled {
            return;
        }
        let entry = CacheEntry {
            tracks,
            created_at_ms: self.clock.now_millis(),
        };
        self.entries.lock().put(key, entry);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
