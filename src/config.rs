//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\studybeats\config.toml
//! - macOS: ~/Library/Application Support/studybeats/config.toml
//! - Linux: ~/.config/studybeats/config.toml
//!
//! An explicit path can be given with `--config`. Every section falls back
//! to defaults, so a file only needs the settings it changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{Limit, SourceKind};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which catalogs to use and their credentials
    pub sources: SourcesConfig,

    /// Daily request budget per source; missing entries are unlimited
    pub rate_limits: BTreeMap<SourceKind, Limit>,

    pub cache: CacheConfig,

    pub aggregator: AggregatorSettings,

    /// Upload server
    pub server: ServerConfig,

    /// Local metadata store
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            rate_limits: BTreeMap::from([
                (SourceKind::Jamendo, Limit::Limited(10_000)),
                (SourceKind::Freesound, Limit::Limited(2_000)),
                (SourceKind::Archive, Limit::Unlimited),
                (SourceKind::YouTube, Limit::Limited(100)),
            ]),
            cache: CacheConfig::default(),
            aggregator: AggregatorSettings::default(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Source order and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Order `tracks` tries sources in (first non-empty wins)
    pub fallback_order: Vec<SourceKind>,

    pub jamendo: JamendoCredentials,
    pub freesound: FreesoundCredentials,
    pub youtube: YouTubeCredentials,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            fallback_order: SourceKind::ALL.to_vec(),
            jamendo: JamendoCredentials::default(),
            freesound: FreesoundCredentials::default(),
            youtube: YouTubeCredentials::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JamendoCredentials {
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FreesoundCredentials {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeCredentials {
    /// Rotated round-robin when a key runs out of quota
    pub api_keys: Vec<String>,
}

/// Query cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Maximum cached queries
    pub max_size: usize,

    /// Entry lifetime in milliseconds
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 1000,
            ttl_ms: 60 * 60 * 1000,
        }
    }
}

/// Playlist building and outbound request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorSettings {
    /// Tracks asked from each source when building a playlist lazily
    pub default_tracks_per_source: usize,

    /// Tracks fetched per look-ahead refill
    pub replenish_batch: usize,

    /// Refill when the cursor is this close to the end (0 = never)
    pub lookahead_threshold: usize,

    /// Per-request timeout for catalog calls
    pub request_timeout_secs: u64,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            default_tracks_per_source: 10,
            replenish_batch: 20,
            lookahead_threshold: 5,
            request_timeout_secs: 15,
        }
    }
}

/// Upload server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Where uploaded files are written
    pub storage_dir: PathBuf,

    /// Prefix for file URLs handed back to clients (derived from host/port when unset)
    pub public_base_url: Option<String>,

    pub max_upload_bytes: usize,

    /// Requests allowed per client IP per window on `/api`
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,

    /// Include internal error details in 500 responses
    pub development: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            storage_dir: data_dir()
                .map(|d| d.join("uploads"))
                .unwrap_or_else(|| PathBuf::from("uploads")),
            public_base_url: None,
            max_upload_bytes: 10 * 1024 * 1024,
            rate_limit_max: 100,
            rate_limit_window_secs: 15 * 60,
            development: false,
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

/// Metadata store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: data_dir()
                .map(|d| d.join(DEFAULT_DB_NAME))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_NAME)),
        }
    }
}

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "studybeats.db";

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("studybeats"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Directory for the database and uploads
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("studybeats"))
}

/// Load configuration from the default location
pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => {
            tracing::warn!("Could not determine config directory, using defaults");
            Config::default()
        }
    }
}

/// Load configuration from `path`
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to `path`
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[sources]"));
        assert!(toml.contains("[rate_limits]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[server]"));
        assert!(toml.contains("archive = \"unlimited\""));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.sources.jamendo.client_id = Some("client-123".to_string());
        config.sources.youtube.api_keys = vec!["k1".into(), "k2".into()];
        config.sources.fallback_order = vec![SourceKind::Archive, SourceKind::Jamendo];
        config.rate_limits.insert(SourceKind::Freesound, Limit::Unlimited);

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.sources.jamendo.client_id.as_deref(), Some("client-123"));
        assert_eq!(parsed.sources.youtube.api_keys, vec!["k1", "k2"]);
        assert_eq!(
            parsed.sources.fallback_order,
            vec![SourceKind::Archive, SourceKind::Jamendo]
        );
        assert_eq!(parsed.rate_limits[&SourceKind::Freesound], Limit::Unlimited);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[sources]
fallback_order = ["soundArchive", "video"]

[rate_limits]
youtube = 5
jamendo = "Infinity"

[cache]
ttl_ms = 1000
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(
            config.sources.fallback_order,
            vec![SourceKind::Freesound, SourceKind::YouTube]
        );
        assert_eq!(config.rate_limits[&SourceKind::YouTube], Limit::Limited(5));
        assert_eq!(config.rate_limits[&SourceKind::Jamendo], Limit::Unlimited);
        // Missing entry means unlimited downstream
        assert!(!config.rate_limits.contains_key(&SourceKind::Archive));

        assert_eq!(config.cache.ttl_ms, 1000);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.aggregator.lookahead_threshold, 5);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");

        let mut config = Config::default();
        config.server.port = 4242;
        config.sources.freesound.token = Some("tok".into());
        save_to(&config, &path).unwrap();

        let loaded = load_from(&path);
        assert_eq!(loaded.server.port, 4242);
        assert_eq!(loaded.sources.freesound.token.as_deref(), Some("tok"));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_unparsable_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = [").unwrap();

        let config = load_from(&path);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.rate_limits.len(), 4);
    }

    #[test]
    fn test_base_url() {
        let mut server = ServerConfig::default();
        assert_eq!(server.base_url(), "http://127.0.0.1:3000");
        server.public_base_url = Some("https://cdn.example.com/".into());
        assert_eq!(server.base_url(), "https://cdn.example.com");
    }
}
