//! Adapter layer: Convert Freesound DTOs to domain models

use super::dto;
use crate::catalog::domain::{
    SourceKind, Track, duration_seconds, native_id, normalize_tags, text_or, url_or_none,
};

const SOURCE: SourceKind = SourceKind::Freesound;

pub fn to_tracks(response: dto::SearchResponse) -> Vec<Track> {
    response.results.into_iter().filter_map(to_track).collect()
}

/// Convert one sound. Sounds without an id are unusable and yield `None`.
pub fn to_track(sound: dto::Sound) -> Option<Track> {
    let id = native_id(sound.id.as_ref())?;

    let previews = sound.previews.unwrap_or_default();
    let images = sound.images.unwrap_or_default();

    let mut tags = normalize_tags(&sound.tags);
    if tags.is_empty() {
        tags = vec!["freesound".to_string(), "creative-commons".to_string()];
    }

    Some(Track {
        id: SOURCE.track_id(&id),
        name: text_or(sound.name.as_deref(), "Unknown"),
        artist: text_or(sound.username.as_deref(), "Unknown"),
        album: SOURCE.display_name().to_string(),
        duration_seconds: duration_seconds(sound.duration.as_ref()),
        image_url: url_or_none(images.waveform_m.as_deref())
            .or_else(|| url_or_none(images.spectral_m.as_deref())),
        stream_url: url_or_none(previews.hq_mp3.as_deref())
            .or_else(|| url_or_none(previews.lq_mp3.as_deref())),
        download_url: url_or_none(sound.download.as_deref()),
        license: text_or(sound.license.as_deref(), "Creative Commons"),
        tags,
        source: SOURCE,
    })
}
