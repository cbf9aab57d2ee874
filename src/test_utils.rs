//! Test utilities and fixtures.
//!
//! Mock tracks with predictable ids and a throwaway HTTP server for
//! exercising the catalog clients without the network.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{mock_tracks, spawn_mock_server};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let app = Router::new().route("/tracks/", get(|| async { "{}" }));
//!     let base = spawn_mock_server(app).await;
//!     let client = JamendoClient::with_base_url(base, Some("id"));
//!     // ... test logic
//! }
//! ```

use axum::Router;

use crate::catalog::{SourceKind, Track};

/// Creates a playable mock track.
///
/// The id is `{source}_mock{i}` and the name `"{Display} Track {i}"`, so
/// tests can assert on both. Customize with struct update syntax:
///
/// ```ignore
/// let custom = Track {
///     name: "Rainy Window".to_string(),
///     ..mock_track(SourceKind::Jamendo, 1)
/// };
/// ```
pub fn mock_track(source: SourceKind, i: usize) -> Track {
    Track {
        id: source.track_id(&format!("mock{i}")),
        name: format!("{} Track {i}", source.display_name()),
        artist: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        duration_seconds: 180,
        image_url: None,
        stream_url: Some(format!("https://example.com/{source}/{i}.mp3")),
        download_url: None,
        license: "Creative Commons".to_string(),
        tags: vec!["lofi".to_string()],
        source,
    }
}

/// Creates `count` mock tracks numbered from 0.
pub fn mock_tracks(source: SourceKind, count: usize) -> Vec<Track> {
    (0..count).map(|i| mock_track(source, i)).collect()
}

/// Serves `app` on an ephemeral localhost port and returns its base URL.
///
/// The server runs until the test's runtime shuts down.
pub async fn spawn_mock_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("Mock server has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{addr}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[test]
    fn test_mock_track_defaults() {
        let track = mock_track(SourceKind::Archive, 3);
        assert_eq!(track.id, "archive_mock3");
        assert_eq!(track.name, "Archive.org Track 3");
        assert_eq!(track.source, SourceKind::Archive);
        assert!(track.is_playable());
    }

    #[test]
    fn test_mock_tracks_are_distinct() {
        let tracks = mock_tracks(SourceKind::YouTube, 4);
        assert_eq!(tracks.len(), 4);
        assert_eq!(tracks[3].id, "youtube_mock3");
    }

    #[tokio::test]
    async fn test_spawn_mock_server_serves_router() {
        let app = Router::new().route("/ping", get(|| async { "pong" }));
        let base = spawn_mock_server(app).await;

        let body = reqwest::get(format!("{base}/ping"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "pong");
    }
}
