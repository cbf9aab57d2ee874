//! Shared HTTP plumbing for the catalog clients.
//!
//! All four clients go through [`get_json`] so status handling is identical:
//! 404 and 429 are named, anything else non-2xx becomes `HTTP {status}: {reason}`.

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::domain::CatalogError;

/// User agent sent to every catalog.
pub const USER_AGENT: &str = concat!(
    "StudyBeats/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/studybeats)"
);

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Build the HTTP client shared by every catalog adapter.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, CatalogError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| CatalogError::Client(e.to_string()))
}

/// Issue a GET and decode the JSON body.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, CatalogError> {
    let response = client.get(url).query(query).send().await?;

    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(CatalogError::QuotaExceeded(format!("{url} returned 429")));
    }

    if !status.is_success() {
        return Err(CatalogError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| CatalogError::Parse(e.to_string()))
}
