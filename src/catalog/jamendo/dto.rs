//! Jamendo API Data Transfer Objects
//!
//! These types match what the Jamendo v3.0 API returns.
//! DO NOT use these types outside the jamendo module - convert to domain types.
//!
//! API Reference: https://developer.jamendo.com/v3.0/tracks
//!
//! Example response:
//! ```json
//! {
//!   "headers": {"status": "success", "code": 0, "error_message": "", "results_count": 1},
//!   "results": [{
//!     "id": "1532771",
//!     "name": "Midnight Tape",
//!     "duration": 181,
//!     "artist_name": "Kolibri",
//!     "album_name": "Late Study",
//!     "album_image": "https://usercontent.jamendo.com/?type=album&id=1&width=300",
//!     "audio": "https://prod-1.storage.jamendo.com/?trackid=1532771&format=mp31",
//!     "audiodownload": "https://prod-1.storage.jamendo.com/download/track/1532771/mp32/",
//!     "license_ccurl": "http://creativecommons.org/licenses/by-nc-sa/3.0/",
//!     "musicinfo": {"tags": {"genres": ["lounge"], "instruments": [], "vartags": ["chill"]}}
//!   }]
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::lenient;

/// Response header block, present on every Jamendo reply
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Headers {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub error_message: Option<String>,
}

impl Headers {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// `/tracks/` response
#[derive(Debug, Clone, Deserialize)]
pub struct TracksResponse {
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub headers: Option<Headers>,
    #[serde(default, deserialize_with = "lenient::lossy_list")]
    pub results: Vec<JamendoTrack>,
}

/// A single track record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JamendoTrack {
    /// String in practice, number in older responses
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    /// Seconds, as a number or numeric string
    pub duration: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub artist_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub album_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub album_image: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub artist_image: Option<String>,
    /// Stream URL
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub audio: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub audiodownload: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub license_ccurl: Option<String>,
    /// Only present with `include=musicinfo`
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub musicinfo: Option<MusicInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MusicInfo {
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub tags: Option<MusicTags>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MusicTags {
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub vartags: Vec<String>,
}

/// `/playlists/` response
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistsResponse {
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub headers: Option<Headers>,
    #[serde(default, deserialize_with = "lenient::lossy_list")]
    pub results: Vec<JamendoPlaylist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JamendoPlaylist {
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub creationdate: Option<String>,
}

/// `/playlists/tracks/` response: one playlist entry carrying its tracks
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTracksResponse {
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub headers: Option<Headers>,
    #[serde(default, deserialize_with = "lenient::lossy_list")]
    pub results: Vec<PlaylistWithTracks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistWithTracks {
    #[serde(default, deserialize_with = "lenient::lossy_list")]
    pub tracks: Vec<JamendoTrack>,
}
