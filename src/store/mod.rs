//! Track metadata store.
//!
//! Durable record of tracks the aggregator has seen, with play counts,
//! ratings and availability. The aggregator only needs [`MetadataStore`];
//! [`SqliteMetadataStore`] is the bundled implementation.

mod sqlite;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{SourceKind, Track};

pub use sqlite::SqliteMetadataStore;

/// Errors from the metadata store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Coarse quality class, derived from source and duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    High,
    Medium,
    Variable,
    Unknown,
}

impl Quality {
    /// Source decides the base class; tracks over five minutes are at least
    /// medium.
    pub fn assess(track: &Track) -> Self {
        let base = match track.source {
            SourceKind::Jamendo => Quality::High,
            SourceKind::Freesound | SourceKind::Archive => Quality::Medium,
            SourceKind::YouTube => Quality::Variable,
        };

        if track.duration_seconds > 300 {
            if base == Quality::High {
                Quality::High
            } else {
                Quality::Medium
            }
        } else {
            base
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Variable => "variable",
            Quality::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "high" => Quality::High,
            "medium" => Quality::Medium,
            "variable" => Quality::Variable,
            _ => Quality::Unknown,
        })
    }
}

/// A track as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTrack {
    #[serde(flatten)]
    pub track: Track,
    pub quality: Quality,
    pub last_updated: DateTime<Utc>,
    pub play_count: i64,
    pub rating: f64,
    pub is_available: bool,
}

/// A user-curated playlist of stored tracks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPlaylist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub track_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// What the aggregator needs from a metadata store.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert or refresh a track. Play count and rating survive a refresh.
    async fn save(&self, track: &Track) -> Result<StoredTrack, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<StoredTrack>, StoreError>;

    /// Returns `false` when the id is unknown.
    async fn increment_play_count(&self, id: &str) -> Result<bool, StoreError>;

    /// Case-insensitive name/artist prefix, or exact tag.
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<StoredTrack>, StoreError>;

    /// Available tracks from one source, most recently updated first.
    async fn list_by_source(
        &self,
        source: SourceKind,
        limit: usize,
    ) -> Result<Vec<StoredTrack>, StoreError>;
}
