//! YouTube Data API v3 Data Transfer Objects
//!
//! DO NOT use these types outside the youtube module - convert to domain types.
//!
//! API Reference: https://developers.google.com/youtube/v3/docs/search/list
//!
//! Errors come back in the same body shape with an `error` block instead of
//! `items`:
//! ```json
//! {"error": {"code": 403, "message": "The request cannot be completed because you have exceeded your quota.",
//!            "errors": [{"reason": "quotaExceeded", "domain": "youtube.quota"}]}}
//! ```

use serde::Deserialize;

use crate::catalog::lenient;

/// `search.list` response (success or error)
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "lenient::lossy_list")]
    pub items: Vec<SearchItem>,
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub id: Option<ItemId>,
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub snippet: Option<Snippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemId {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub channel_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub medium: Option<Thumbnail>,
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub high: Option<Thumbnail>,
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient::lossy_list")]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quota_error() {
        let json = r#"{"error": {"code": 403, "message": "quota", "errors": [{"reason": "quotaExceeded"}]}}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, Some(403));
        assert_eq!(error.errors[0].reason.as_deref(), Some("quotaExceeded"));
        assert!(response.items.is_empty());
    }

    #[test]
    fn test_parse_item() {
        let json = r#"{"items": [{"id": {"kind": "youtube#video", "videoId": "jfKfPfyJRdk"},
            "snippet": {"title": "lofi hip hop radio", "channelTitle": "Lofi Girl",
                        "thumbnails": {"medium": {"url": "https://i.ytimg.com/vi/x/mqdefault.jpg"}}}}]}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let item = &response.items[0];
        assert_eq!(
            item.id.as_ref().unwrap().video_id.as_deref(),
            Some("jfKfPfyJRdk")
        );
        assert_eq!(
            item.snippet.as_ref().unwrap().channel_title.as_deref(),
            Some("Lofi Girl")
        );
    }
}
