//! Adapter layer: Convert Archive.org DTOs to domain models

use super::dto;
use crate::catalog::domain::{SourceKind, Track, duration_seconds, text_or};

const SOURCE: SourceKind = SourceKind::Archive;

/// Public origin for stream, download and thumbnail URLs
const ARCHIVE_ORIGIN: &str = "https://archive.org";

/// Only the derivative mp3 is streamable at a sane bitrate
const STREAM_FORMAT: &str = "VBR MP3";

/// Playable files taken from a single item
pub const MAX_FILES_PER_ITEM: usize = 1;

/// Docs worth a detail fetch, in result order.
pub fn item_docs(response: dto::SearchResponse) -> Vec<dto::SearchDoc> {
    response
        .response
        .unwrap_or_default()
        .docs
        .into_iter()
        .filter(|d| d.identifier.as_deref().is_some_and(|i| !i.is_empty()))
        .collect()
}

/// Build tracks for one item from its file list.
pub fn to_tracks(doc: &dto::SearchDoc, metadata: dto::ItemMetadata) -> Vec<Track> {
    let Some(identifier) = doc.identifier.as_deref() else {
        return Vec::new();
    };

    metadata
        .files
        .into_iter()
        .filter(|f| f.format.as_deref() == Some(STREAM_FORMAT))
        .filter_map(|f| {
            let name = f.name.filter(|n| !n.is_empty())?;
            Some((name, f.title, f.length))
        })
        .take(MAX_FILES_PER_ITEM)
        .map(|(file_name, title, length)| {
            let file_url = format!(
                "{ARCHIVE_ORIGIN}/download/{}/{}",
                urlencoding::encode(identifier),
                encode_path(&file_name)
            );

            Track {
                id: SOURCE.track_id(&format!("{identifier}_{file_name}")),
                name: text_or(title.as_deref(), &file_name),
                artist: text_or(doc.creator.as_deref(), "Unknown"),
                album: text_or(doc.title.as_deref(), SOURCE.display_name()),
                duration_seconds: duration_seconds(length.as_ref()),
                image_url: Some(format!(
                    "{ARCHIVE_ORIGIN}/services/img/{}",
                    urlencoding::encode(identifier)
                )),
                stream_url: Some(file_url.clone()),
                download_url: Some(file_url),
                license: "Public Domain".to_string(),
                tags: vec!["archive".to_string(), "public-domain".to_string()],
                source: SOURCE,
            }
        })
        .collect()
}

/// Encode each path segment; file names may live in sub-folders.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
