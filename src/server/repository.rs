//! Song catalog behind the upload server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// A catalog record as returned by `GET /api/songs/:id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: u64,
    pub title: String,
    pub artist: String,
    /// "m:ss"
    pub duration: String,
    pub url: String,
    pub cover_art: String,
    pub genre: String,
    pub created_at: DateTime<Utc>,
}

/// List projection: everything but `createdAt`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongSummary {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub duration: String,
    pub url: String,
    pub cover_art: String,
    pub genre: String,
}

impl From<Song> for SongSummary {
    fn from(song: Song) -> Self {
        Self {
            id: song.id,
            title: song.title,
            artist: song.artist,
            duration: song.duration,
            url: song.url,
            cover_art: song.cover_art,
            genre: song.genre,
        }
    }
}

/// Fields for a record about to be inserted; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub duration: String,
    pub url: String,
    pub cover_art: String,
    pub genre: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Song storage unavailable: {0}")]
    Backend(String),
}

/// Storage port for song records.
#[async_trait]
pub trait SongRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Song>, RepositoryError>;

    async fn get(&self, id: u64) -> Result<Option<Song>, RepositoryError>;

    async fn insert(&self, song: NewSong) -> Result<Song, RepositoryError>;

    /// Returns the removed record, if there was one.
    async fn delete(&self, id: u64) -> Result<Option<Song>, RepositoryError>;

    /// Case-insensitive substring on title or artist, then exact genre.
    async fn search(
        &self,
        query: Option<&str>,
        genre: Option<&str>,
    ) -> Result<Vec<Song>, RepositoryError>;
}

#[derive(Debug, Default)]
struct Songs {
    records: Vec<Song>,
    /// Highest id ever handed out. Never decreases.
    last_id: u64,
}

/// Process-local song list. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySongRepository {
    songs: RwLock<Songs>,
}

impl InMemorySongRepository {
    pub fn new(records: Vec<Song>) -> Self {
        let last_id = records.iter().map(|s| s.id).max().unwrap_or(0);
        Self {
            songs: RwLock::new(Songs { records, last_id }),
        }
    }

    /// The two demo records, with URLs under `files_url`.
    pub fn seeded(files_url: &str, created_at: DateTime<Utc>) -> Self {
        let demo = |id, title: &str, artist: &str, duration: &str, slug: &str| Song {
            id,
            title: title.to_string(),
            artist: artist.to_string(),
            duration: duration.to_string(),
            url: format!("{files_url}/music/{slug}.mp3"),
            cover_art: format!("{files_url}/covers/{slug}.jpg"),
            genre: "lofi".to_string(),
            created_at,
        };

        Self::new(vec![
            demo(1, "Chill Vibes", "StudyBeats", "3:45", "chill-vibes"),
            demo(2, "Study Focus", "LofiGirl", "4:12", "study-focus"),
        ])
    }
}

fn matches(song: &Song, query: Option<&str>, genre: Option<&str>) -> bool {
    let query_ok = query.is_none_or(|q| {
        let q = q.to_lowercase();
        song.title.to_lowercase().contains(&q) || song.artist.to_lowercase().contains(&q)
    });
    let genre_ok = genre.is_none_or(|g| song.genre.eq_ignore_ascii_case(g));
    query_ok && genre_ok
}

#[async_trait]
impl SongRepository for InMemorySongRepository {
    async fn list(&self) -> Result<Vec<Song>, RepositoryError> {
        Ok(self.songs.read().records.clone())
    }

    async fn get(&self, id: u64) -> Result<Option<Song>, RepositoryError> {
        Ok(self.songs.read().records.iter().find(|s| s.id == id).cloned())
    }

    async fn insert(&self, new: NewSong) -> Result<Song, RepositoryError> {
        let mut songs = self.songs.write();
        songs.last_id += 1;
        let id = songs.last_id;
        let song = Song {
            id,
            title: new.title,
            artist: new.artist,
            duration: new.duration,
            url: new.url,
            cover_art: new.cover_art,
            genre: new.genre,
            created_at: new.created_at,
        };
        songs.records.push(song.clone());
        Ok(song)
    }

    async fn delete(&self, id: u64) -> Result<Option<Song>, RepositoryError> {
        let mut songs = self.songs.write();
        Ok(songs
            .records
            .iter()
            .position(|s| s.id == id)
            .map(|index| songs.records.remove(index)))
    }

    async fn search(
        &self,
        query: Option<&str>,
        genre: Option<&str>,
    ) -> Result<Vec<Song>, RepositoryError> {
        Ok(self
            .songs
            .read()
            .records
            .iter()
            .filter(|s| matches(s, query, genre))
            .cloned()
            .collect())
    }
}
