//! SQLite-backed [`MetadataStore`].

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::{MetadataStore, Quality, StoreError, StoredPlaylist, StoredTrack};
use crate::catalog::{SourceKind, Track};

const TRACK_COLUMNS: &str = "t.id, t.name, t.artist, t.album, t.duration_seconds, t.image_url, \
     t.stream_url, t.download_url, t.license, t.tags, t.source, t.quality, t.last_updated, \
     t.play_count, t.rating, t.is_available";

#[derive(Debug, sqlx::FromRow)]
struct TrackRow {
    id: String,
    name: String,
    artist: String,
    album: String,
    duration_seconds: i64,
    image_url: Option<String>,
    stream_url: Option<String>,
    download_url: Option<String>,
    license: String,
    tags: String,
    source: String,
    quality: String,
    last_updated: String,
    play_count: i64,
    rating: f64,
    is_available: bool,
}

impl TryFrom<TrackRow> for StoredTrack {
    type Error = StoreError;

    fn try_from(row: TrackRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.id.clone(),
            reason,
        };

        let source: SourceKind = row
            .source
            .parse()
            .map_err(|_| corrupt(format!("unknown source '{}'", row.source)))?;
        let tags: Vec<String> =
            serde_json::from_str(&row.tags).map_err(|e| corrupt(format!("tags: {e}")))?;
        let last_updated = DateTime::parse_from_rfc3339(&row.last_updated)
            .map_err(|e| corrupt(format!("last_updated: {e}")))?
            .with_timezone(&Utc);
        let quality = row.quality.parse().unwrap_or(Quality::Unknown);

        Ok(StoredTrack {
            track: Track {
                id: row.id,
                name: row.name,
                artist: row.artist,
                album: row.album,
                duration_seconds: u32::try_from(row.duration_seconds).unwrap_or(0),
                image_url: row.image_url,
                stream_url: row.stream_url,
                download_url: row.download_url,
                license: row.license,
                tags,
                source,
            },
            quality,
            last_updated,
            play_count: row.play_count,
            rating: row.rating,
            is_available: row.is_available,
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    // Fixed precision keeps the text sortable
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Escape LIKE wildcards so user input only ever matches literally.
fn like_prefix(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 1);
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn to_stored(rows: Vec<TrackRow>) -> Result<Vec<StoredTrack>, StoreError> {
    rows.into_iter().map(StoredTrack::try_from).collect()
}

/// Track metadata in a local SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}", path.display());
        if !sqlx::Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            sqlx::Sqlite::create_database(&db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        Self::migrated(pool).await
    }

    /// A private database that lives as long as the store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        // Every connection to :memory: is a separate database, so pin one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    async fn fetch_tracks(
        &self,
        sql: &str,
        binds: &[&str],
        limit: usize,
    ) -> Result<Vec<StoredTrack>, StoreError> {
        let mut query = sqlx::query_as::<_, TrackRow>(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let rows = query
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        to_stored(rows)
    }

    /// Mark a track (un)available. Returns `false` for an unknown id.
    pub async fn set_availability(&self, id: &str, available: bool) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE tracks SET is_available = ? WHERE id = ?")
            .bind(available)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Most played available tracks.
    pub async fn popular(&self, limit: usize) -> Result<Vec<StoredTrack>, StoreError> {
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks t WHERE t.is_available = 1 \
             ORDER BY t.play_count DESC, t.rowid ASC LIMIT ?"
        );
        self.fetch_tracks(&sql, &[], limit).await
    }

    /// Create a playlist over already-stored track ids, keeping their order.
    pub async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        track_ids: &[String],
    ) -> Result<StoredPlaylist, StoreError> {
        let created_at = Utc::now();
        let id = format!(
            "playlist_{}_{:06x}",
            created_at.timestamp_millis(),
            rand::rng().random_range(0..0x100_0000u32)
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO playlists (id, name, description, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(description)
            .bind(timestamp(created_at))
            .execute(&mut *tx)
            .await?;

        for (position, track_id) in track_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO playlist_tracks (playlist_id, position, track_id) VALUES (?, ?, ?)",
            )
            .bind(&id)
            .bind(i64::try_from(position).unwrap_or(i64::MAX))
            .bind(track_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(target: "store", playlist = %id, tracks = track_ids.len(), "Created playlist");

        Ok(StoredPlaylist {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            track_ids: track_ids.to_vec(),
            created_at,
        })
    }

    /// Tracks of a playlist in order. Ids no longer in the store are skipped.
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<StoredTrack>, StoreError> {
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM playlists WHERE id = ?")
            .bind(playlist_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("playlist {playlist_id}")));
        }

        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM playlist_tracks pt \
             JOIN tracks t ON t.id = pt.track_id \
             WHERE pt.playlist_id = ? ORDER BY pt.position"
        );
        let rows = sqlx::query_as::<_, TrackRow>(&sql)
            .bind(playlist_id)
            .fetch_all(&self.pool)
            .await?;
        to_stored(rows)
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn save(&self, track: &Track) -> Result<StoredTrack, StoreError> {
        let quality = Quality::assess(track);
        let tags = serde_json::to_string(&track.tags).map_err(|e| StoreError::Corrupt {
            id: track.id.clone(),
            reason: format!("tags: {e}"),
        })?;

        sqlx::query(
            "INSERT INTO tracks (id, name, artist, album, duration_seconds, image_url, stream_url, \
             download_url, license, tags, source, quality, last_updated, play_count, rating, is_available) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, 1) \
             ON CONFLICT(id) DO UPDATE SET \
             name = excluded.name, artist = excluded.artist, album = excluded.album, \
             duration_seconds = excluded.duration_seconds, image_url = excluded.image_url, \
             stream_url = excluded.stream_url, download_url = excluded.download_url, \
             license = excluded.license, tags = excluded.tags, source = excluded.source, \
             quality = excluded.quality, last_updated = excluded.last_updated, is_available = 1",
        )
        .bind(&track.id)
        .bind(&track.name)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(i64::from(track.duration_seconds))
        .bind(&track.image_url)
        .bind(&track.stream_url)
        .bind(&track.download_url)
        .bind(&track.license)
        .bind(tags)
        .bind(track.source.as_str())
        .bind(quality.as_str())
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.get(&track.id)
            .await?
            .ok_or_else(|| StoreError::NotFound(track.id.clone()))
    }

    async fn get(&self, id: &str) -> Result<Option<StoredTrack>, StoreError> {
        let sql = format!("SELECT {TRACK_COLUMNS} FROM tracks t WHERE t.id = ?");
        let row = sqlx::query_as::<_, TrackRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(StoredTrack::try_from).transpose()
    }

    async fn increment_play_count(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE tracks SET play_count = play_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, term: &str, limit: usize) -> Result<Vec<StoredTrack>, StoreError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let prefix = like_prefix(term);
        let tag = term.to_lowercase();
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks t WHERE t.is_available = 1 AND ( \
             t.name LIKE ? ESCAPE '\\' OR t.artist LIKE ? ESCAPE '\\' \
             OR EXISTS (SELECT 1 FROM json_each(t.tags) WHERE lower(json_each.value) = ?)) \
             ORDER BY t.play_count DESC, t.name ASC LIMIT ?"
        );
        self.fetch_tracks(&sql, &[prefix.as_str(), prefix.as_str(), tag.as_str()], limit)
            .await
    }

    async fn list_by_source(
        &self,
        source: SourceKind,
        limit: usize,
    ) -> Result<Vec<StoredTrack>, StoreError> {
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks t WHERE t.source = ? AND t.is_available = 1 \
             ORDER BY t.last_updated DESC, t.rowid DESC LIMIT ?"
        );
        self.fetch_tracks(&sql, &[source.as_str()], limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_track, mock_tracks};

    async fn store() -> SqliteMetadataStore {
        SqliteMetadataStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = store().await;
        let mut track = mock_track(SourceKind::Jamendo, 1);
        track.tags = vec!["lofi".into(), "chill".into()];

        let saved = store.save(&track).await.unwrap();
        assert_eq!(saved.track, track);
        assert_eq!(saved.quality, Quality::High);
        assert_eq!(saved.play_count, 0);
        assert!(saved.is_available);

        let fetched = store.get(&track.id).await.unwrap().unwrap();
        assert_eq!(fetched, saved);
        assert!(store.get("jamendo_nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resave_keeps_play_count() {
        let store = store().await;
        let mut track = mock_track(SourceKind::Freesound, 1);
        store.save(&track).await.unwrap();
        assert!(store.increment_play_count(&track.id).await.unwrap());
        assert!(store.increment_play_count(&track.id).await.unwrap());

        track.name = "Renamed".into();
        let saved = store.save(&track).await.unwrap();
        assert_eq!(saved.play_count, 2);
        assert_eq!(saved.track.name, "Renamed");
    }

    #[tokio::test]
    async fn test_increment_unknown_id() {
        let store = store().await;
        assert!(!store.increment_play_count("archive_missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_prefix_and_tag() {
        let store = store().await;
        let mut a = mock_track(SourceKind::Jamendo, 1);
        a.name = "Rainy Window".into();
        a.artist = "Kalm".into();
        a.tags = vec!["Study".into()];
        let mut b = mock_track(SourceKind::Freesound, 2);
        b.name = "Night Drive".into();
        b.artist = "Rainer".into();
        let mut c = mock_track(SourceKind::Archive, 3);
        c.name = "Brainstorm".into();
        for t in [&a, &b, &c] {
            store.save(t).await.unwrap();
        }

        let ids = |found: Vec<StoredTrack>| {
            let mut ids: Vec<String> = found.into_iter().map(|s| s.track.id).collect();
            ids.sort();
            ids
        };

        // Prefix only: "Brainstorm" contains "rain" but doesn't start with it
        let found = store.search("rain", 10).await.unwrap();
        assert_eq!(ids(found), vec![b.id.clone(), a.id.clone()]);

        let found = store.search("STUDY", 10).await.unwrap();
        assert_eq!(ids(found), vec![a.id.clone()]);

        assert!(store.search("   ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let store = store().await;
        let mut track = mock_track(SourceKind::Jamendo, 1);
        track.name = "100% chill".into();
        store.save(&track).await.unwrap();
        store.save(&mock_track(SourceKind::Jamendo, 2)).await.unwrap();

        assert_eq!(store.search("100%", 10).await.unwrap().len(), 1);
        assert!(store.search("%", 10).await.unwrap().is_empty());
        assert!(store.search("_", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_source_filters_and_limits() {
        let store = store().await;
        for track in mock_tracks(SourceKind::Archive, 3) {
            store.save(&track).await.unwrap();
        }
        store.save(&mock_track(SourceKind::YouTube, 0)).await.unwrap();
        assert!(store.set_availability("archive_mock1", false).await.unwrap());

        let listed = store.list_by_source(SourceKind::Archive, 10).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.track.id.as_str()).collect();
        assert_eq!(ids, vec!["archive_mock2", "archive_mock0"]);

        let limited = store.list_by_source(SourceKind::Archive, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_popular_orders_by_plays() {
        let store = store().await;
        for track in mock_tracks(SourceKind::Jamendo, 3) {
            store.save(&track).await.unwrap();
        }
        for _ in 0..3 {
            store.increment_play_count("jamendo_mock2").await.unwrap();
        }
        store.increment_play_count("jamendo_mock0").await.unwrap();

        let popular = store.popular(2).await.unwrap();
        let ids: Vec<&str> = popular.iter().map(|s| s.track.id.as_str()).collect();
        assert_eq!(ids, vec!["jamendo_mock2", "jamendo_mock0"]);
    }

    #[tokio::test]
    async fn test_playlist_keeps_order_and_skips_missing() {
        let store = store().await;
        for track in mock_tracks(SourceKind::Freesound, 3) {
            store.save(&track).await.unwrap();
        }
        let ids = vec![
            "freesound_mock2".to_string(),
            "freesound_gone".to_string(),
            "freesound_mock0".to_string(),
        ];

        let playlist = store
            .create_playlist("Focus", Some("deep work"), &ids)
            .await
            .unwrap();
        assert!(playlist.id.starts_with("playlist_"));
        assert_eq!(playlist.track_ids, ids);

        let tracks = store.playlist_tracks(&playlist.id).await.unwrap();
        let got: Vec<&str> = tracks.iter().map(|s| s.track.id.as_str()).collect();
        assert_eq!(got, vec!["freesound_mock2", "freesound_mock0"]);
    }

    #[tokio::test]
    async fn test_unknown_playlist_is_not_found() {
        let store = store().await;
        let err = store.playlist_tracks("playlist_0").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_open_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tracks.db");

        {
            let store = SqliteMetadataStore::open(&path).await.unwrap();
            store.save(&mock_track(SourceKind::YouTube, 4)).await.unwrap();
        }

        let reopened = SqliteMetadataStore::open(&path).await.unwrap();
        let stored = reopened.get("youtube_mock4").await.unwrap().unwrap();
        assert_eq!(stored.quality, Quality::Variable);
    }

    #[test]
    fn test_like_prefix_escapes() {
        assert_eq!(like_prefix("a_b%"), "a\\_b\\%%");
        assert_eq!(like_prefix("x\\"), "x\\\\%");
    }
}
