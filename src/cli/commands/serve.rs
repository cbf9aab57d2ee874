//! Upload server and upload client commands.

use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;
use tokio::runtime::Runtime;

use crate::catalog::http::USER_AGENT;
use crate::config::ServerConfig;
use crate::server;

/// Run the upload server in the foreground
pub fn cmd_serve(rt: &Runtime, config: &ServerConfig) -> anyhow::Result<()> {
    println!("🎵 Upload server on http://{}:{}", config.host, config.port);
    println!("   Files in {}", config.storage_dir.display());
    rt.block_on(server::serve(config))?;
    Ok(())
}

/// Split "Artist - Title.mp3" into (artist, title).
fn artist_title_from_name(path: &Path) -> (Option<String>, Option<String>) {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return (None, None);
    };
    match stem.split_once(" - ") {
        Some((artist, title)) => (
            Some(artist.trim().to_string()).filter(|s| !s.is_empty()),
            Some(title.trim().to_string()).filter(|s| !s.is_empty()),
        ),
        None => (None, Some(stem.trim().to_string()).filter(|s| !s.is_empty())),
    }
}

#[derive(Debug, Deserialize)]
struct UploadReply {
    success: bool,
    message: Option<String>,
    error: Option<String>,
    song: Option<UploadedSong>,
}

#[derive(Debug, Deserialize)]
struct UploadedSong {
    id: u64,
    url: String,
}

/// Send a file to a running upload server
pub fn cmd_upload(
    rt: &Runtime,
    file: &Path,
    title: Option<&str>,
    artist: Option<&str>,
    duration: Option<&str>,
    genre: Option<&str>,
    server: &str,
) -> anyhow::Result<()> {
    let (guessed_artist, guessed_title) = artist_title_from_name(file);
    let title = title.map(str::to_string).or(guessed_title);
    let artist = artist.map(str::to_string).or(guessed_artist);
    let (Some(title), Some(artist)) = (title, artist) else {
        bail!("Need --title and --artist (or a file named \"Artist - Title.ext\")");
    };

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    let content_type = mime_guess::from_path(file).first_or_octet_stream();

    rt.block_on(async {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("reading {}", file.display()))?;
        let size = bytes.len();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type.essence_str())?;
        let mut form = reqwest::multipart::Form::new()
            .text("title", title.clone())
            .text("artist", artist.clone())
            .part("music", part);
        if let Some(duration) = duration {
            form = form.text("duration", duration.to_string());
        }
        if let Some(genre) = genre {
            form = form.text("genre", genre.to_string());
        }

        let url = format!("{}/api/upload", server.trim_end_matches('/'));
        println!("Uploading {artist} - {title} ({} KB) to {url}", size / 1024);

        let response = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?
            .post(&url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("contacting {url}"))?;
        let status = response.status();
        let reply: UploadReply = response
            .json()
            .await
            .with_context(|| format!("unexpected reply from {url} ({status})"))?;

        match reply {
            UploadReply {
                success: true,
                song: Some(song),
                ..
            } => {
                println!("✓ Uploaded as #{}: {}", song.id, song.url);
                Ok(())
            }
            UploadReply { message, error, .. } => {
                let message = message.unwrap_or_else(|| status.to_string());
                match error {
                    Some(error) => bail!("✗ {message} ({error})"),
                    None => bail!("✗ {message}"),
                }
            }
        }
    })
}
