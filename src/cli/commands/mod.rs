//! CLI command definitions and dispatch.
//!
//! Each group of subcommands lives in its own submodule:
//! - `catalog`: aggregated tracks, mixing, search, budgets and probing
//! - `browse`: provider-specific lookups (Jamendo playlists, Freesound sounds)
//! - `store`: syncing into and querying the local metadata store
//! - `serve`: the upload server and its client

mod browse;
mod catalog;
mod serve;
mod store;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

use crate::catalog::{SourceKind, Track, domain::format_duration};
use crate::config::{self, Config};

pub use browse::{cmd_playlists, cmd_track};
pub use catalog::{cmd_mix, cmd_next, cmd_probe, cmd_search, cmd_status, cmd_tracks};
pub use serve::{cmd_serve, cmd_upload};
pub use store::{cmd_library, cmd_sync};

/// StudyBeats CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: OS config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Jamendo client id (overrides config)
    #[arg(long, global = true, env = "JAMENDO_CLIENT_ID", hide_env_values = true)]
    pub jamendo_client_id: Option<String>,

    /// Freesound API token (overrides config)
    #[arg(long, global = true, env = "FREESOUND_TOKEN", hide_env_values = true)]
    pub freesound_token: Option<String>,

    /// YouTube API keys, comma-separated (overrides config)
    #[arg(
        long,
        global = true,
        env = "YOUTUBE_API_KEYS",
        hide_env_values = true,
        value_delimiter = ','
    )]
    pub youtube_api_keys: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch one page of tracks from the first source that has any
    Tracks {
        #[arg(short, long, default_value = "20")]
        limit: usize,
        #[arg(short, long, default_value = "0")]
        offset: usize,
    },
    /// Build a shuffled playlist from every available source
    Mix {
        #[arg(short, long, default_value = "10")]
        per_source: usize,
    },
    /// Play through the endless playlist
    Next {
        /// How many tracks to take
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
    /// Search every source that supports it
    Search {
        query: String,
        /// Results per source
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show daily request budgets
    Status,
    /// Call every source directly and report what comes back
    Probe {
        #[arg(short, long, default_value = "3")]
        limit: usize,
    },
    /// Jamendo curated playlists, or the tracks of one
    Playlists {
        /// Playlist id; lists playlists when omitted
        id: Option<String>,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Look up a single Freesound sound
    Track {
        /// Sound id, with or without the `freesound_` prefix
        id: String,
    },
    /// Save a mixed playlist into the metadata store
    Sync {
        #[arg(short, long, default_value = "10")]
        per_source: usize,
        /// Database path (default from config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Query and curate the local metadata store
    Library {
        #[command(subcommand)]
        action: LibraryAction,
        /// Database path (default from config)
        #[arg(long, global = true)]
        db: Option<PathBuf>,
    },
    /// Run the upload server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory for uploaded files
        #[arg(long)]
        storage_dir: Option<PathBuf>,
        /// Show internal error details to clients
        #[arg(long)]
        development: bool,
    },
    /// Upload an audio file to a running upload server
    Upload {
        file: PathBuf,
        /// Defaults to the part after " - " in the file name
        #[arg(long)]
        title: Option<String>,
        /// Defaults to the part before " - " in the file name
        #[arg(long)]
        artist: Option<String>,
        /// "m:ss"
        #[arg(long)]
        duration: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        /// Server base URL (default from config)
        #[arg(long)]
        server: Option<String>,
    },
}

/// Metadata store actions
#[derive(Subcommand)]
pub enum LibraryAction {
    /// Most played tracks
    Popular {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Name/artist prefix or exact tag
    Find {
        term: String,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Most recently synced tracks from one source
    Source {
        source: SourceKind,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Count a play
    Played { id: String },
    /// Hide a track from listings (or bring it back with --show)
    Hide {
        id: String,
        #[arg(long)]
        show: bool,
    },
    /// Create a playlist from stored track ids
    CreatePlaylist {
        name: String,
        #[arg(required = true)]
        track_ids: Vec<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Tracks of a stored playlist
    Playlist { id: String },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let config = load_config(cli);

    match &cli.command {
        Commands::Tracks { limit, offset } => cmd_tracks(&rt, &config, *limit, *offset),
        Commands::Mix { per_source } => cmd_mix(&rt, &config, *per_source),
        Commands::Next { count } => cmd_next(&rt, &config, *count),
        Commands::Search { query, limit } => cmd_search(&rt, &config, query, *limit),
        Commands::Status => cmd_status(&config),
        Commands::Probe { limit } => cmd_probe(&rt, &config, *limit),
        Commands::Playlists { id, limit } => cmd_playlists(&rt, &config, id.as_deref(), *limit),
        Commands::Track { id } => cmd_track(&rt, &config, id),
        Commands::Sync { per_source, db } => cmd_sync(&rt, &config, *per_source, db.as_deref()),
        Commands::Library { action, db } => cmd_library(&rt, &config, action, db.as_deref()),
        Commands::Serve {
            host,
            port,
            storage_dir,
            development,
        } => {
            let mut server = config.server.clone();
            if let Some(host) = host {
                server.host = host.clone();
            }
            if let Some(port) = port {
                server.port = *port;
            }
            if let Some(dir) = storage_dir {
                server.storage_dir = dir.clone();
            }
            server.development |= *development;
            cmd_serve(&rt, &server)
        }
        Commands::Upload {
            file,
            title,
            artist,
            duration,
            genre,
            server,
        } => {
            let server = server.clone().unwrap_or_else(|| config.server.base_url());
            cmd_upload(
                &rt,
                file,
                title.as_deref(),
                artist.as_deref(),
                duration.as_deref(),
                genre.as_deref(),
                &server,
            )
        }
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Config file plus command-line/environment credential overrides.
pub(crate) fn load_config(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    apply_overrides(&mut config, cli);
    config
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(id) = cli.jamendo_client_id.as_ref().filter(|s| !s.is_empty()) {
        config.sources.jamendo.client_id = Some(id.clone());
    }
    if let Some(token) = cli.freesound_token.as_ref().filter(|s| !s.is_empty()) {
        config.sources.freesound.token = Some(token.clone());
    }
    let keys: Vec<String> = cli
        .youtube_api_keys
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if !keys.is_empty() {
        config.sources.youtube.api_keys = keys;
    }
}

/// One line per track: "  3. Artist - Name [3:05] (jamendo)"
pub(crate) fn print_track(index: usize, track: &Track) {
    let duration = if track.duration_seconds > 0 {
        format!(" [{}]", format_duration(track.duration_seconds))
    } else {
        String::new()
    };
    println!(
        "{:>3}. {} - {}{} ({})",
        index + 1,
        track.artist,
        track.name,
        duration,
        track.source
    );
}
