//! Upload API: a small self-hosted song catalog.
//!
//! Routes:
//! - `GET /health` - liveness
//! - `GET /api/songs`, `GET /api/songs/:id`, `DELETE /api/songs/:id`
//! - `POST /api/upload` - multipart, field `music` plus `title`/`artist`/`duration`/`genre`
//! - `GET /api/search?q=&genre=`
//! - `GET /files/...` - uploaded files, when serving from a local directory
//!
//! Everything under `/api` is rate limited per client IP. Every response,
//! success or failure, carries a `success` flag.

pub mod blob;
mod error;
mod health;
mod rate_limit;
pub mod repository;
mod songs;
mod state;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, header};
use axum::middleware;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::clock;
use crate::config::ServerConfig;
use crate::error::{Result, ResultExt};

pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use state::AppState;

use blob::LocalBlobStore;
use repository::InMemorySongRepository;

/// Room for multipart boundaries and the text fields on top of the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router. `files_dir` is served under `/files`.
pub fn router(state: AppState, files_dir: Option<&Path>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD));

    let api = Router::new()
        .route("/songs", get(songs::list_songs))
        .route("/songs/:id", get(songs::get_song).delete(songs::delete_song))
        .route("/upload", post(songs::upload).layer(body_limit))
        .route("/search", get(songs::search))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ));

    let mut app = Router::new()
        .route("/health", get(health::health))
        .nest("/api", api);

    if let Some(dir) = files_dir {
        app = app.nest_service("/files", ServeDir::new(dir));
    }

    let development = state.development;
    with_common_layers(app.fallback(error::not_found), development).with_state(state)
}

/// Panic recovery, security header, CORS and request tracing, innermost first.
fn with_common_layers(app: Router<AppState>, development: bool) -> Router<AppState> {
    app.layer(CatchPanicLayer::custom(error::panic_response(development)))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Production state: seeded in-memory catalog, files on local disk.
pub fn local_state(config: &ServerConfig) -> AppState {
    let clock = clock::system();
    let files_url = format!("{}/files", config.base_url());
    let seeded_at = DateTime::from_timestamp_millis(clock.now_millis()).unwrap_or_else(Utc::now);
    let window_ms = i64::try_from(config.rate_limit_window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);

    AppState {
        songs: Arc::new(InMemorySongRepository::seeded(&files_url, seeded_at)),
        blobs: Arc::new(LocalBlobStore::new(&config.storage_dir, files_url)),
        limiter: Arc::new(RateLimiter::new(config.rate_limit_max, window_ms, clock.clone())),
        clock,
        max_upload_bytes: config.max_upload_bytes,
        development: config.development,
    }
}

/// Run the upload server until Ctrl-C.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .with_context(format!("creating storage directory {:?}", config.storage_dir))?;

    let app = router(local_state(config), Some(&config.storage_dir));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(format!("binding {addr}"))?;

    info!(target: "server", "Upload server listening on http://{addr}");
    info!(target: "server", "Health check: http://{addr}/health");
    if config.development {
        warn!(target: "server", "Development mode: internal errors are shown to clients");
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .with_context("running upload server")?;

    info!(target: "server", "Upload server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(target: "server", error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::server::blob::MemoryBlobStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    const NOW: i64 = 1_700_000_000_000;
    const BOUNDARY: &str = "studybeats-test-boundary";

    struct Fixture {
        app: Router,
        blobs: Arc<MemoryBlobStore>,
    }

    fn fixture_with(max_upload_bytes: usize, rate_limit_max: u32) -> Fixture {
        let clock = Arc::new(ManualClock::new(NOW));
        let blobs = Arc::new(MemoryBlobStore::new());
        let state = AppState {
            songs: Arc::new(InMemorySongRepository::seeded(
                "memory://bucket",
                DateTime::from_timestamp_millis(NOW).unwrap(),
            )),
            blobs: blobs.clone(),
            limiter: Arc::new(RateLimiter::new(rate_limit_max, 60_000, clock.clone())),
            clock,
            max_upload_bytes,
            development: false,
        };
        Fixture {
            app: router(state, None),
            blobs,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(1024, 1000)
    }

    /// Hand-rolled multipart/form-data body.
    fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"music\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response: Response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn valid_upload() -> Request<Body> {
        multipart(
            &[("title", "Rainy Window"), ("artist", "Kalm")],
            Some(("rainy window.mp3", "audio/mpeg", &b"ID3\x04fake"[..])),
        )
    }

    async fn explode() -> &'static str {
        panic!("handler blew up")
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_500_envelope() {
        let clock = Arc::new(ManualClock::new(NOW));
        let state = AppState {
            songs: Arc::new(InMemorySongRepository::default()),
            blobs: Arc::new(MemoryBlobStore::new()),
            limiter: Arc::new(RateLimiter::new(10, 60_000, clock.clone())),
            clock,
            max_upload_bytes: 1024,
            development: false,
        };
        let app = with_common_layers(Router::new().route("/boom", get(explode)), false)
            .with_state(state);

        let response: Response = app.clone().oneshot(get_req("/boom")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

        let (status, json) = send(&app, get_req("/boom")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Something went wrong");
        assert_eq!(json["error"], "Something went wrong");

        // The server keeps answering afterwards
        let (status, _) = send(&app, get_req("/boom")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health() {
        let f = fixture();
        let (status, json) = send(&f.app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "OK");
        assert!(json["timestamp"].as_str().unwrap().starts_with("2023-11-14"));
    }

    #[tokio::test]
    async fn test_list_songs_is_lightweight() {
        let f = fixture();
        let (status, json) = send(&f.app, get_req("/api/songs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 2);
        assert_eq!(json["songs"][0]["title"], "Chill Vibes");
        assert!(json["songs"][0].get("createdAt").is_none());
    }

    #[tokio::test]
    async fn test_get_song() {
        let f = fixture();
        let (status, json) = send(&f.app, get_req("/api/songs/2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["song"]["artist"], "LofiGirl");
        assert!(json["song"]["createdAt"].is_string());

        for uri in ["/api/songs/99", "/api/songs/abc"] {
            let (status, json) = send(&f.app, get_req(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(json["success"], false);
            assert_eq!(json["message"], "Song not found");
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_non_audio() {
        let f = fixture();
        let request = multipart(
            &[("title", "Notes"), ("artist", "Me")],
            Some(("notes.txt", "text/plain", &b"hello"[..])),
        );
        let (status, json) = send(&f.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Only audio files are allowed!");
    }

    #[tokio::test]
    async fn test_upload_requires_file_and_fields() {
        let f = fixture();

        let (status, json) = send(&f.app, multipart(&[("title", "T"), ("artist", "A")], None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "No file uploaded");

        let request = multipart(
            &[("title", "T"), ("artist", "  ")],
            Some(("a.mp3", "audio/mpeg", &b"x"[..])),
        );
        let (status, json) = send(&f.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Title and artist are required");
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let f = fixture_with(16, 1000);
        let request = multipart(
            &[("title", "T"), ("artist", "A")],
            Some(("big.mp3", "audio/mpeg", &[0u8; 64][..])),
        );
        let (status, json) = send(&f.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().starts_with("File too large"));
    }

    #[tokio::test]
    async fn test_upload_get_delete_cycle() {
        let f = fixture();

        let (status, json) = send(&f.app, valid_upload()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Song uploaded successfully");
        let song = &json["song"];
        assert_eq!(song["id"], 3);
        assert_eq!(song["duration"], "0:00");
        assert_eq!(song["genre"], "lofi");
        let key = format!("music/{NOW}-rainy_window.mp3");
        assert_eq!(song["url"], format!("memory://bucket/{key}"));
        assert_eq!(f.blobs.content_type(&key).as_deref(), Some("audio/mpeg"));

        let (status, _) = send(&f.app, get_req("/api/songs/3")).await;
        assert_eq!(status, StatusCode::OK);

        let delete = Request::delete("/api/songs/3").body(Body::empty()).unwrap();
        let (status, json) = send(&f.app, delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Song deleted successfully");
        assert!(!f.blobs.contains(&key));

        let (status, _) = send(&f.app, get_req("/api/songs/3")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let delete = Request::delete("/api/songs/3").body(Body::empty()).unwrap();
        let (status, _) = send(&f.app, delete).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_guesses_type_from_name() {
        let f = fixture();
        let request = multipart(
            &[("title", "T"), ("artist", "A"), ("genre", "jazz"), ("duration", "2:05")],
            Some(("track.mp3", "application/octet-stream", &b"x"[..])),
        );
        let (status, json) = send(&f.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["song"]["genre"], "jazz");
        assert_eq!(json["song"]["duration"], "2:05");
        let key = format!("music/{NOW}-track.mp3");
        assert_eq!(f.blobs.content_type(&key).as_deref(), Some("audio/mpeg"));
    }

    #[tokio::test]
    async fn test_storage_failure_hides_details() {
        let f = fixture();
        f.blobs.fail(true);
        let (status, json) = send(&f.app, valid_upload()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Failed to upload song");
        assert_eq!(json["error"], "Something went wrong");

        // Nothing was recorded
        let (_, json) = send(&f.app, get_req("/api/songs")).await;
        assert_eq!(json["count"], 2);
    }

    #[tokio::test]
    async fn test_search() {
        let f = fixture();
        send(&f.app, valid_upload()).await;

        let (status, json) = send(&f.app, get_req("/api/search?q=chill")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
        assert_eq!(json["songs"][0]["title"], "Chill Vibes");

        let (_, json) = send(&f.app, get_req("/api/search?q=KALM")).await;
        assert_eq!(json["songs"][0]["title"], "Rainy Window");

        let (_, json) = send(&f.app, get_req("/api/search?genre=lofi&q=")).await;
        assert_eq!(json["count"], 3);

        let (_, json) = send(&f.app, get_req("/api/search?genre=jazz")).await;
        assert_eq!(json["count"], 0);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let f = fixture();
        let (status, json) = send(&f.app, get_req("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_api_rate_limited_per_ip() {
        let f = fixture_with(1024, 2);
        let from = |ip: &str| {
            Request::get("/api/songs")
                .header("x-forwarded-for", ip)
                .body(Body::empty())
                .unwrap()
        };

        assert_eq!(send(&f.app, from("203.0.113.1")).await.0, StatusCode::OK);
        assert_eq!(send(&f.app, from("203.0.113.1")).await.0, StatusCode::OK);
        let (status, json) = send(&f.app, from("203.0.113.1")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["message"], "Too many requests, please try again later.");

        // Other clients and non-API routes are unaffected
        assert_eq!(send(&f.app, from("203.0.113.2")).await.0, StatusCode::OK);
        assert_eq!(send(&f.app, get_req("/health")).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_files_are_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("music")).unwrap();
        std::fs::write(dir.path().join("music/1-a.mp3"), b"ID3").unwrap();

        let mut config = ServerConfig::default();
        config.storage_dir = dir.path().to_path_buf();
        let app = router(local_state(&config), Some(dir.path()));

        let response = app.oneshot(get_req("/files/music/1-a.mp3")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    }
}
