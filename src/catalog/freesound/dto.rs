//! Freesound API Data Transfer Objects
//!
//! DO NOT use these types outside the freesound module - convert to domain types.
//!
//! API Reference: https://freesound.org/docs/api/resources_apiv2.html
//!
//! Example `/search/text/` response (with `fields=` restricting each result):
//! ```json
//! {
//!   "count": 1204,
//!   "next": "https://freesound.org/apiv2/search/text/?page=2...",
//!   "results": [{
//!     "id": 193021,
//!     "name": "lofi loop 80bpm.wav",
//!     "username": "tapeworm",
//!     "duration": 48.213,
//!     "license": "http://creativecommons.org/publicdomain/zero/1.0/",
//!     "tags": ["lofi", "loop"],
//!     "download": "https://freesound.org/apiv2/sounds/193021/download/",
//!     "previews": {"preview-hq-mp3": "https://cdn.freesound.org/previews/193/193021_hq.mp3"},
//!     "images": {"waveform_m": "https://cdn.freesound.org/displays/193/193021_wave_M.png"}
//!   }]
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::lenient;

/// `/search/text/` response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "lenient::lossy_list")]
    pub results: Vec<Sound>,
}

/// A single sound; also the body of `/sounds/{id}/`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sound {
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub username: Option<String>,
    /// Float seconds
    pub duration: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub license: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub download: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub previews: Option<Previews>,
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub images: Option<Images>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Previews {
    #[serde(rename = "preview-hq-mp3", default, deserialize_with = "lenient::opt_string")]
    pub hq_mp3: Option<String>,
    #[serde(rename = "preview-lq-mp3", default, deserialize_with = "lenient::opt_string")]
    pub lq_mp3: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Images {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub waveform_m: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub spectral_m: Option<String>,
}
