//! The aggregator's current playlist and its shuffle.

use rand::Rng;

use super::domain::Track;

/// Ordered tracks plus a play cursor.
///
/// The list only grows; the cursor wraps modulo the length, so running past
/// the end replays from the start.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    cursor: usize,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Track under the cursor, then move the cursor one step (wrapping).
    pub fn advance(&mut self) -> Option<Track> {
        let track = self.tracks.get(self.cursor)?.clone();
        self.cursor = (self.cursor + 1) % self.tracks.len();
        Some(track)
    }

    /// Append tracks whose ids aren't in the list yet, without touching the
    /// cursor. Returns how many went in.
    pub fn extend_new(&mut self, tracks: impl IntoIterator<Item = Track>) -> usize {
        let before = self.tracks.len();
        for track in tracks {
            if !self.tracks.iter().any(|t| t.id == track.id) {
                self.tracks.push(track);
            }
        }
        self.tracks.len() - before
    }

    /// Whether the cursor sits within the last `threshold` positions.
    ///
    /// A threshold of 0 turns look-ahead off.
    pub fn needs_replenish(&self, threshold: usize) -> bool {
        threshold > 0 && !self.tracks.is_empty() && self.cursor >= self.tracks.len().saturating_sub(threshold)
    }
}

/// Unbiased in-place Fisher–Yates shuffle.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}
