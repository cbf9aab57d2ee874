//! Internal domain models for catalog tracks.
//!
//! These types are OUR types - they don't change when external APIs change.
//! Every provider response gets converted into a [`Track`] by that provider's
//! adapter, using the normalization helpers at the bottom of this file so that
//! absent or malformed upstream fields become safe defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The external catalogs we aggregate.
///
/// Serialized with the provider name (`"jamendo"`, ...). The generic role names
/// used by older configs (`"catalogA"`, `"soundArchive"`, `"publicArchive"`,
/// `"video"`) are accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Royalty-free music catalog
    #[serde(alias = "catalogA")]
    Jamendo,
    /// Sound-effects archive
    #[serde(alias = "soundArchive")]
    Freesound,
    /// Public-domain archive
    #[serde(alias = "publicArchive")]
    Archive,
    /// Video platform
    #[serde(alias = "video")]
    YouTube,
}

impl SourceKind {
    /// All sources, in the default fallback order.
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Jamendo,
        SourceKind::Freesound,
        SourceKind::Archive,
        SourceKind::YouTube,
    ];

    /// Stable machine name, also used as the track id prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Jamendo => "jamendo",
            SourceKind::Freesound => "freesound",
            SourceKind::Archive => "archive",
            SourceKind::YouTube => "youtube",
        }
    }

    /// Human-readable name, used as the album fallback.
    pub fn display_name(self) -> &'static str {
        match self {
            SourceKind::Jamendo => "Jamendo",
            SourceKind::Freesound => "Freesound",
            SourceKind::Archive => "Archive.org",
            SourceKind::YouTube => "YouTube",
        }
    }

    /// Build a globally unique track id from a provider-native id.
    pub fn track_id(self, native_id: &str) -> String {
        format!("{}_{}", self.as_str(), native_id)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jamendo" | "cataloga" | "catalog-a" => Ok(SourceKind::Jamendo),
            "freesound" | "soundarchive" | "sound-archive" => Ok(SourceKind::Freesound),
            "archive" | "publicarchive" | "public-archive" => Ok(SourceKind::Archive),
            "youtube" | "video" => Ok(SourceKind::YouTube),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// A normalized, playable-or-flagged track from one of the catalogs.
///
/// Created fresh per fetch and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Source-prefixed id, e.g. `freesound_193021`
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    /// Whole seconds; 0 means unknown
    #[serde(rename = "duration")]
    pub duration_seconds: u32,
    #[serde(rename = "image")]
    pub image_url: Option<String>,
    /// Absent when the catalog entry cannot be streamed
    pub stream_url: Option<String>,
    pub download_url: Option<String>,
    pub license: String,
    pub tags: Vec<String>,
    pub source: SourceKind,
}

impl Track {
    /// Whether the player can do anything with this track.
    pub fn is_playable(&self) -> bool {
        self.stream_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Tracks without an id can't be cached, stored or de-duplicated.
    pub fn has_identity(&self) -> bool {
        !self.id.is_empty()
    }
}

/// A curated playlist published on a catalog (Jamendo only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPlaylist {
    /// Provider-native playlist id, usable with `playlist_tracks`
    pub id: String,
    pub name: String,
    pub user: String,
    pub created_at: Option<String>,
}

/// Errors that can occur while talking to a catalog.
///
/// These never escape an adapter's `fetch_tracks`/`search`; they're logged and
/// turned into an empty result at that boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("No credentials configured for {0}")]
    MissingCredentials(SourceKind),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CatalogError::Timeout
        } else if e.is_decode() {
            CatalogError::Parse(e.to_string())
        } else {
            CatalogError::Network(e.to_string())
        }
    }
}

// ============================================================================
// Normalization helpers
// ============================================================================

/// Display text, or `fallback` when absent/blank.
pub fn text_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Text from a JSON value that may be a string, a number or an array of
/// strings (Archive.org returns all three for `creator`/`title`).
pub fn value_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|v| value_text(Some(v)))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

/// A URL, or `None` when absent/blank.
pub fn url_or_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from)
}

/// Normalize a duration field to whole seconds.
///
/// Accepts numbers (int or float seconds), numeric strings and `h:mm:ss` /
/// `m:ss` timecodes. Anything else is 0 ("unknown").
pub fn duration_seconds(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(n)) => n.as_f64().map(clamp_seconds).unwrap_or(0),
        Some(Value::String(s)) => parse_duration_str(s).unwrap_or(0),
        _ => 0,
    }
}

/// Parse `"225"`, `"225.7"`, `"3:45"` or `"1:02:03"` into seconds.
pub fn parse_duration_str(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if !s.contains(':') {
        return s.parse::<f64>().ok().map(clamp_seconds);
    }

    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut total = 0f64;
    for part in parts {
        let v: f64 = part.trim().parse().ok()?;
        if !v.is_finite() || v < 0.0 {
            return None;
        }
        total = total * 60.0 + v;
    }
    Some(clamp_seconds(total))
}

/// Format seconds as `m:ss` (minutes are not wrapped into hours).
pub fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn clamp_seconds(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.floor().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Provider ids come back as strings or numbers depending on the API.
pub fn native_id(value: Option<&Value>) -> Option<String> {
    value_text(value)
}

/// Trim, drop blanks and de-duplicate while keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}
