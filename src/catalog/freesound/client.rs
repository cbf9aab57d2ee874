//! Freesound HTTP client
//!
//! Token auth via query parameter; 2000 requests/day on a standard key.
//! See: https://freesound.org/docs/api/

use super::{adapter, dto};
use crate::catalog::domain::{CatalogError, SourceKind, Track};
use crate::catalog::http::get_json;

const BASE_URL: &str = "https://freesound.org/apiv2";

/// Freesound caps `page_size` at 150
const MAX_PAGE_SIZE: usize = 150;

const LOFI_QUERY: &str = "lofi OR chillhop OR ambient OR chill OR downtempo";
const DURATION_FILTER: &str = "duration:[30.0 TO 600.0]";
const FIELDS: &str = "id,name,description,duration,download,previews,images,license,username,tags";

/// Freesound API client
pub struct FreesoundClient {
    http_client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl FreesoundClient {
    pub fn new(http_client: reqwest::Client, token: Option<String>) -> Self {
        Self {
            http_client,
            base_url: BASE_URL.to_string(),
            token,
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>, token: Option<&str>) -> Self {
        let http_client = crate::catalog::http::build_client(crate::catalog::http::DEFAULT_TIMEOUT)
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: base_url.into(),
            token: token.map(String::from),
        }
    }

    fn token(&self) -> Result<&str, CatalogError> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(CatalogError::MissingCredentials(SourceKind::Freesound))
    }

    /// Lofi-ish sounds between 30s and 10min, best match first.
    ///
    /// Freesound pages rather than offsets, so `offset` is rounded down to
    /// the page containing it.
    pub async fn lofi_tracks(&self, limit: usize, offset: usize) -> Result<Vec<Track>, CatalogError> {
        let page_size = limit.clamp(1, MAX_PAGE_SIZE);
        let page = offset / page_size + 1;

        let query = [
            ("token", self.token()?.to_string()),
            ("query", LOFI_QUERY.to_string()),
            ("filter", DURATION_FILTER.to_string()),
            ("sort", "score".to_string()),
            ("page_size", page_size.to_string()),
            ("page", page.to_string()),
            ("fields", FIELDS.to_string()),
        ];

        self.search_request(&query).await
    }

    /// Free-text search, still restricted to the lofi niche
    pub async fn search_tracks(&self, term: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        let query = [
            ("token", self.token()?.to_string()),
            ("query", format!("{term} AND (lofi OR chillhop OR ambient)")),
            ("filter", DURATION_FILTER.to_string()),
            ("sort", "score".to_string()),
            ("page_size", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("fields", FIELDS.to_string()),
        ];

        self.search_request(&query).await
    }

    /// Look up a single sound by its Freesound id (without the `freesound_` prefix).
    ///
    /// Returns `Ok(None)` when the sound doesn't exist.
    pub async fn track_by_id(&self, sound_id: &str) -> Result<Option<Track>, CatalogError> {
        let query = [
            ("token", self.token()?.to_string()),
            ("fields", FIELDS.to_string()),
        ];
        let url = format!(
            "{}/sounds/{}/",
            self.base_url,
            urlencoding::encode(sound_id.trim_start_matches("freesound_"))
        );

        match get_json::<dto::Sound>(&self.http_client, &url, &query).await {
            Ok(sound) => Ok(adapter::to_track(sound)),
            Err(CatalogError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn search_request(&self, query: &[(&str, String)]) -> Result<Vec<Track>, CatalogError> {
        let response: dto::SearchResponse = get_json(
            &self.http_client,
            &format!("{}/search/text/", self.base_url),
            query,
        )
        .await?;
        Ok(adapter::to_tracks(response))
    }
}
