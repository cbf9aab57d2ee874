//! Archive.org HTTP client
//!
//! No key and no published quota. Listing needs one search call plus one
//! metadata call per item to find a playable file.

use futures::StreamExt;
use tracing::debug;

use super::{adapter, dto};
use crate::catalog::domain::{CatalogError, Track};
use crate::catalog::http::get_json;

const BASE_URL: &str = "https://archive.org";

const LOFI_QUERY: &str = "collection:opensource_audio AND (lofi OR chillhop OR ambient)";

/// Detail fetches in flight at once
const DETAIL_CONCURRENCY: usize = 4;

/// Archive.org API client
pub struct ArchiveClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ArchiveClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http_client = crate::catalog::http::build_client(crate::catalog::http::DEFAULT_TIMEOUT)
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// Most-downloaded lofi items, one playable file each.
    ///
    /// Only the search call can fail the whole request; an item whose detail
    /// fetch fails is skipped.
    pub async fn lofi_tracks(&self, limit: usize, offset: usize) -> Result<Vec<Track>, CatalogError> {
        let query = [
            ("q", LOFI_QUERY.to_string()),
            ("fl[]", "identifier".to_string()),
            ("fl[]", "title".to_string()),
            ("fl[]", "creator".to_string()),
            ("sort[]", "downloads desc".to_string()),
            ("rows", limit.to_string()),
            ("start", offset.to_string()),
            ("output", "json".to_string()),
        ];

        let response: dto::SearchResponse = get_json(
            &self.http_client,
            &format!("{}/advancedsearch.php", self.base_url),
            &query,
        )
        .await?;

        let docs = adapter::item_docs(response);

        let per_item: Vec<Vec<Track>> = futures::stream::iter(docs)
            .map(|doc| async move {
                match self.item_metadata(&doc).await {
                    Ok(metadata) => adapter::to_tracks(&doc, metadata),
                    Err(e) => {
                        debug!(
                            target: "catalog::archive",
                            identifier = doc.identifier.as_deref().unwrap_or_default(),
                            error = %e,
                            "Skipping item, detail fetch failed"
                        );
                        Vec::new()
                    }
                }
            })
            .buffered(DETAIL_CONCURRENCY)
            .collect()
            .await;

        Ok(per_item.into_iter().flatten().collect())
    }

    async fn item_metadata(&self, doc: &dto::SearchDoc) -> Result<dto::ItemMetadata, CatalogError> {
        let identifier = doc.identifier.as_deref().unwrap_or_default();
        let url = format!(
            "{}/metadata/{}",
            self.base_url,
            urlencoding::encode(identifier)
        );
        get_json(&self.http_client, &url, &[]).await
    }
}
