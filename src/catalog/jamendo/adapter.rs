//! Adapter layer: Convert Jamendo DTOs to domain models
//!
//! This is the ONLY place where Jamendo DTO types are converted to domain types.

use super::dto;
use crate::catalog::domain::{
    CatalogError, CatalogPlaylist, SourceKind, Track, duration_seconds, native_id,
    normalize_tags, text_or, url_or_none,
};

const SOURCE: SourceKind = SourceKind::Jamendo;

/// Convert a `/tracks/` response, failing only when Jamendo itself reports failure.
pub fn to_tracks(response: dto::TracksResponse) -> Result<Vec<Track>, CatalogError> {
    check_headers(response.headers.as_ref())?;
    Ok(response.results.into_iter().filter_map(to_track).collect())
}

/// Convert a `/playlists/tracks/` response (tracks of the first playlist entry).
pub fn to_playlist_tracks(
    response: dto::PlaylistTracksResponse,
) -> Result<Vec<Track>, CatalogError> {
    check_headers(response.headers.as_ref())?;
    Ok(response
        .results
        .into_iter()
        .next()
        .map(|p| p.tracks.into_iter().filter_map(to_track).collect())
        .unwrap_or_default())
}

/// Convert a `/playlists/` response.
pub fn to_playlists(
    response: dto::PlaylistsResponse,
) -> Result<Vec<CatalogPlaylist>, CatalogError> {
    check_headers(response.headers.as_ref())?;
    Ok(response
        .results
        .into_iter()
        .filter_map(|p| {
            Some(CatalogPlaylist {
                id: native_id(p.id.as_ref())?,
                name: text_or(p.name.as_deref(), "Untitled"),
                user: text_or(p.user_name.as_deref(), "Unknown"),
                created_at: p.creationdate.filter(|d| !d.trim().is_empty()),
            })
        })
        .collect())
}

fn check_headers(headers: Option<&dto::Headers>) -> Result<(), CatalogError> {
    match headers {
        Some(h) if h.is_success() => Ok(()),
        Some(h) => Err(CatalogError::Api(text_or(
            h.error_message.as_deref(),
            "Jamendo reported failure",
        ))),
        None => Err(CatalogError::Parse("missing response headers".to_string())),
    }
}

/// Records without an id are dropped; everything else gets a default.
fn to_track(t: dto::JamendoTrack) -> Option<Track> {
    let id = native_id(t.id.as_ref())?;

    let tags = t
        .musicinfo
        .and_then(|m| m.tags)
        .map(|tags| normalize_tags(tags.genres.iter().chain(tags.vartags.iter())))
        .filter(|tags| !tags.is_empty())
        .unwrap_or_else(|| vec!["jamendo".to_string(), "creative-commons".to_string()]);

    Some(Track {
        id: SOURCE.track_id(&id),
        name: text_or(t.name.as_deref(), "Unknown"),
        artist: text_or(t.artist_name.as_deref(), "Unknown"),
        album: text_or(t.album_name.as_deref(), SOURCE.display_name()),
        duration_seconds: duration_seconds(t.duration.as_ref()),
        image_url: url_or_none(t.album_image.as_deref())
            .or_else(|| url_or_none(t.artist_image.as_deref())),
        stream_url: url_or_none(t.audio.as_deref()),
        download_url: url_or_none(t.audiodownload.as_deref()),
        license: text_or(t.license_ccurl.as_deref(), "Creative Commons"),
        tags,
        source: SOURCE,
    })
}
