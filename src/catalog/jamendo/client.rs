//! Jamendo HTTP client
//!
//! Royalty-free catalog, 10k requests/day on a free client id.
//! See: https://developer.jamendo.com/v3.0

use super::{adapter, dto};
use crate::catalog::domain::{CatalogError, CatalogPlaylist, SourceKind, Track};
use crate::catalog::http::get_json;

const BASE_URL: &str = "https://api.jamendo.com/v3.0";

/// Tags that steer results toward the study-music niche
const LOFI_TAGS: &str = "lofi,chillhop,ambient,downtempo,chillout";
const SEARCH_TAGS: &str = "lofi,chillhop,ambient";

/// Jamendo API client
pub struct JamendoClient {
    http_client: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
}

impl JamendoClient {
    /// Create a client sharing the aggregator's HTTP client
    pub fn new(http_client: reqwest::Client, client_id: Option<String>) -> Self {
        Self {
            http_client,
            base_url: BASE_URL.to_string(),
            client_id,
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>, client_id: Option<&str>) -> Self {
        let http_client = crate::catalog::http::build_client(crate::catalog::http::DEFAULT_TIMEOUT)
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: base_url.into(),
            client_id: client_id.map(String::from),
        }
    }

    fn client_id(&self) -> Result<&str, CatalogError> {
        self.client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(CatalogError::MissingCredentials(SourceKind::Jamendo))
    }

    /// Popular tracks carrying any of the lofi tags
    pub async fn lofi_tracks(&self, limit: usize, offset: usize) -> Result<Vec<Track>, CatalogError> {
        let query = [
            ("client_id", self.client_id()?.to_string()),
            ("format", "json".to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("order", "popularity_total".to_string()),
            ("tags", LOFI_TAGS.to_string()),
            ("include", "musicinfo".to_string()),
            ("audioformat", "mp32".to_string()),
        ];

        let response: dto::TracksResponse =
            get_json(&self.http_client, &format!("{}/tracks/", self.base_url), &query).await?;
        adapter::to_tracks(response)
    }

    /// Track name search within the lofi tags
    pub async fn search_tracks(&self, term: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        let query = [
            ("client_id", self.client_id()?.to_string()),
            ("format", "json".to_string()),
            ("limit", limit.to_string()),
            ("namesearch", term.to_string()),
            ("tags", SEARCH_TAGS.to_string()),
            ("include", "musicinfo".to_string()),
            ("audioformat", "mp32".to_string()),
        ];

        let response: dto::TracksResponse =
            get_json(&self.http_client, &format!("{}/tracks/", self.base_url), &query).await?;
        adapter::to_tracks(response)
    }

    /// Curated lofi playlists, most popular first
    pub async fn playlists(&self, limit: usize) -> Result<Vec<CatalogPlaylist>, CatalogError> {
        let query = [
            ("client_id", self.client_id()?.to_string()),
            ("format", "json".to_string()),
            ("limit", limit.to_string()),
            ("order", "popularity_total".to_string()),
            ("namesearch", "lofi".to_string()),
        ];

        let response: dto::PlaylistsResponse =
            get_json(&self.http_client, &format!("{}/playlists/", self.base_url), &query).await?;
        adapter::to_playlists(response)
    }

    /// Tracks of one playlist, in playlist order
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, CatalogError> {
        let query = [
            ("client_id", self.client_id()?.to_string()),
            ("format", "json".to_string()),
            ("id", playlist_id.to_string()),
            ("audioformat", "mp32".to_string()),
        ];

        let response: dto::PlaylistTracksResponse = get_json(
            &self.http_client,
            &format!("{}/playlists/tracks/", self.base_url),
            &query,
        )
        .await?;
        adapter::to_playlist_tracks(response)
    }
}
