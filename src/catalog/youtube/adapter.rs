//! Adapter layer: Convert YouTube DTOs to domain models

use super::dto;
use crate::catalog::domain::{SourceKind, Track, text_or, url_or_none};

const SOURCE: SourceKind = SourceKind::YouTube;

/// Error reasons that mean "this key is spent", not "this request is bad"
const QUOTA_REASONS: [&str; 4] = [
    "quotaExceeded",
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
];

pub fn to_tracks(response: dto::SearchResponse) -> Vec<Track> {
    response.items.into_iter().filter_map(to_track).collect()
}

/// Items without a video id (channels, playlists) are skipped.
fn to_track(item: dto::SearchItem) -> Option<Track> {
    let video_id = item
        .id
        .and_then(|id| id.video_id)
        .filter(|id| !id.is_empty())?;
    let snippet = item.snippet.unwrap_or_default();
    let thumbnails = snippet.thumbnails.unwrap_or_default();

    let image_url = [thumbnails.medium, thumbnails.high, thumbnails.default]
        .into_iter()
        .flatten()
        .find_map(|t| url_or_none(t.url.as_deref()));

    Some(Track {
        id: SOURCE.track_id(&video_id),
        name: text_or(snippet.title.as_deref(), "Unknown"),
        artist: text_or(snippet.channel_title.as_deref(), "Unknown"),
        album: SOURCE.display_name().to_string(),
        // search.list carries no duration; it would cost a videos.list call
        duration_seconds: 0,
        image_url,
        stream_url: Some(format!("https://www.youtube.com/watch?v={video_id}")),
        download_url: None,
        license: "YouTube".to_string(),
        tags: vec!["youtube".to_string(), "lofi".to_string()],
        source: SOURCE,
    })
}

/// Whether an API error means the current key's quota is spent.
pub fn is_quota_error(error: &dto::ApiError, status: u16) -> bool {
    let by_reason = error.errors.iter().any(|e| {
        e.reason
            .as_deref()
            .is_some_and(|r| QUOTA_REASONS.contains(&r))
    });
    let by_message = (status == 403 || error.code == Some(403))
        && error
            .message
            .as_deref()
            .is_some_and(|m| m.to_lowercase().contains("quota"));

    by_reason || by_message || status == 429
}

/// Human-readable error text for logs.
pub fn error_message(error: &dto::ApiError) -> String {
    text_or(error.message.as_deref(), "YouTube API error")
}
