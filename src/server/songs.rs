//! Song catalog routes.

use axum::Json;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::blob::{key_from_url, object_key};
use super::error::ApiError;
use super::repository::{NewSong, Song, SongSummary};
use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct SongsResponse<T> {
    pub success: bool,
    pub count: usize,
    pub songs: Vec<T>,
}

impl<T> SongsResponse<T> {
    fn new(songs: Vec<T>) -> Self {
        Self {
            success: true,
            count: songs.len(),
            songs,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SongResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub song: Song,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
}

/// Ids are integers; anything else can't name a song.
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::song_not_found())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// GET /api/songs
pub async fn list_songs(
    State(state): State<AppState>,
) -> Result<Json<SongsResponse<SongSummary>>, ApiError> {
    let songs = state
        .songs
        .list()
        .await
        .map_err(|e| ApiError::internal("Failed to fetch songs", e, state.development))?;

    Ok(Json(SongsResponse::new(
        songs.into_iter().map(SongSummary::from).collect(),
    )))
}

/// GET /api/songs/:id
pub async fn get_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SongResponse>, ApiError> {
    let id = parse_id(&id)?;
    let song = state
        .songs
        .get(id)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch song", e, state.development))?
        .ok_or_else(ApiError::song_not_found)?;

    Ok(Json(SongResponse {
        success: true,
        message: None,
        song,
    }))
}

/// DELETE /api/songs/:id
pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    const FAILED: &str = "Failed to delete song";

    let id = parse_id(&id)?;
    let song = state
        .songs
        .get(id)
        .await
        .map_err(|e| ApiError::internal(FAILED, e, state.development))?
        .ok_or_else(ApiError::song_not_found)?;

    match key_from_url(&song.url) {
        Some(key) => state
            .blobs
            .delete(&key)
            .await
            .map_err(|e| ApiError::internal(FAILED, e, state.development))?,
        None => warn!(target: "server", id, url = %song.url, "No object key in song URL"),
    }

    state
        .songs
        .delete(id)
        .await
        .map_err(|e| ApiError::internal(FAILED, e, state.development))?;

    info!(target: "server", id, title = %song.title, "Song deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "Song deleted successfully",
    }))
}

/// GET /api/search?q=&genre=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SongsResponse<Song>>, ApiError> {
    let q = non_blank(query.q);
    let genre = non_blank(query.genre);

    let songs = state
        .songs
        .search(q.as_deref(), genre.as_deref())
        .await
        .map_err(|e| ApiError::internal("Search failed", e, state.development))?;

    Ok(Json(SongsResponse::new(songs)))
}

// ============================================================================
// Upload
// ============================================================================

#[derive(Debug)]
struct UploadedFile {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    title: Option<String>,
    artist: Option<String>,
    duration: Option<String>,
    genre: Option<String>,
}

fn file_too_large(max_bytes: usize) -> ApiError {
    ApiError::validation(format!(
        "File too large (max {} MB)",
        max_bytes.div_ceil(1024 * 1024)
    ))
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        file_too_large(max_bytes)
    } else {
        ApiError::validation(format!("Invalid upload: {}", e.body_text()))
    }
}

/// Declared MIME type, or one guessed from the file name when the client
/// sent none. Only `audio/*` passes.
fn audio_content_type(declared: Option<&str>, file_name: &str) -> Option<String> {
    let content_type = match declared.filter(|ct| !ct.is_empty() && *ct != "application/octet-stream") {
        Some(ct) => ct.to_ascii_lowercase(),
        None => mime_guess::from_path(file_name).first()?.essence_str().to_string(),
    };
    content_type.starts_with("audio/").then_some(content_type)
}

async fn read_file(
    mut field: Field<'_>,
    name: String,
    content_type: String,
    max_bytes: usize,
) -> Result<UploadedFile, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(file_too_large(max_bytes));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(UploadedFile {
        name,
        content_type,
        bytes,
    })
}

async fn read_form(mut multipart: Multipart, max_bytes: usize) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "music" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = audio_content_type(field.content_type(), &file_name)
                    .ok_or_else(|| ApiError::validation("Only audio files are allowed!"))?;
                form.file = Some(read_file(field, file_name, content_type, max_bytes).await?);
            }
            "title" | "artist" | "duration" | "genre" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_bytes))?;
                let slot = match field_name.as_str() {
                    "title" => &mut form.title,
                    "artist" => &mut form.artist,
                    "duration" => &mut form.duration,
                    _ => &mut form.genre,
                };
                *slot = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/upload
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SongResponse>, ApiError> {
    const FAILED: &str = "Failed to upload song";

    let multipart = multipart
        .map_err(|e| ApiError::validation(format!("Invalid upload: {}", e.body_text())))?;
    let form = read_form(multipart, state.max_upload_bytes).await?;

    let file = form
        .file
        .ok_or_else(|| ApiError::validation("No file uploaded"))?;
    let (Some(title), Some(artist)) = (non_blank(form.title), non_blank(form.artist)) else {
        return Err(ApiError::validation("Title and artist are required"));
    };

    let now = state.clock.now_millis();
    let key = object_key(now, &file.name);
    let url = state
        .blobs
        .put(&key, &file.bytes, &file.content_type)
        .await
        .map_err(|e| ApiError::internal(FAILED, e, state.development))?;

    let new_song = NewSong {
        title,
        artist,
        duration: non_blank(form.duration).unwrap_or_else(|| "0:00".to_string()),
        url,
        cover_art: format!("https://picsum.photos/200/200?random={now}"),
        genre: non_blank(form.genre).unwrap_or_else(|| "lofi".to_string()),
        created_at: DateTime::from_timestamp_millis(now).unwrap_or_else(Utc::now),
    };

    let song = match state.songs.insert(new_song).await {
        Ok(song) => song,
        Err(e) => {
            // Don't leave an orphaned object behind
            if let Err(cleanup) = state.blobs.delete(&key).await {
                warn!(target: "server", key, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(ApiError::internal(FAILED, e, state.development));
        }
    };

    info!(
        target: "server",
        id = song.id,
        title = %song.title,
        size = file.bytes.len(),
        "Song uploaded"
    );
    Ok(Json(SongResponse {
        success: true,
        message: Some("Song uploaded successfully"),
        song,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_content_type() {
        assert_eq!(
            audio_content_type(Some("audio/mpeg"), "a.bin").as_deref(),
            Some("audio/mpeg")
        );
        assert_eq!(audio_content_type(Some("text/plain"), "a.mp3"), None);
        assert_eq!(
            audio_content_type(Some("application/octet-stream"), "a.mp3").as_deref(),
            Some("audio/mpeg")
        );
        assert_eq!(audio_content_type(None, "notes.txt"), None);
        assert_eq!(audio_content_type(None, "noext"), None);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("3").unwrap(), 3);
        assert!(matches!(parse_id("abc"), Err(ApiError::NotFound(_))));
        assert!(matches!(parse_id("-1"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" Kalm ".into())).as_deref(), Some("Kalm"));
        assert_eq!(non_blank(None), None);
    }
}
