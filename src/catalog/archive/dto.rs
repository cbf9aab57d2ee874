//! Archive.org API Data Transfer Objects
//!
//! Two endpoints are involved:
//! - `advancedsearch.php?output=json` returns item records (no files)
//! - `metadata/{identifier}` returns the item's file list
//!
//! Archive.org metadata is user-supplied, so almost every text field may be a
//! string, an array of strings, or missing.

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::lenient;

/// `advancedsearch.php` response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub response: Option<SearchBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchBody {
    #[serde(default, deserialize_with = "lenient::lossy_list")]
    pub docs: Vec<SearchDoc>,
}

/// One item record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchDoc {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub identifier: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub creator: Option<String>,
}

/// `metadata/{identifier}` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemMetadata {
    #[serde(default, deserialize_with = "lenient::lossy_list")]
    pub files: Vec<ItemFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFile {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    /// Seconds as a float string, or `mm:ss`
    pub length: Option<Value>,
}
