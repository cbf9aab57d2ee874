//! Provider-specific lookups that bypass the aggregator.

use std::time::Duration;

use tokio::runtime::Runtime;

use super::print_track;
use crate::catalog::freesound::FreesoundClient;
use crate::catalog::http::build_client;
use crate::catalog::jamendo::JamendoClient;
use crate::config::Config;

fn http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    Ok(build_client(Duration::from_secs(
        config.aggregator.request_timeout_secs.max(1),
    ))?)
}

/// List Jamendo playlists, or the tracks of one
pub fn cmd_playlists(
    rt: &Runtime,
    config: &Config,
    id: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let client = JamendoClient::new(
        http_client(config)?,
        config.sources.jamendo.client_id.clone(),
    );

    rt.block_on(async {
        match id {
            Some(id) => {
                let tracks = client.playlist_tracks(id).await?;
                if tracks.is_empty() {
                    println!("Playlist {id} has no playable tracks.");
                }
                for (i, track) in tracks.iter().enumerate() {
                    print_track(i, track);
                }
            }
            None => {
                let playlists = client.playlists(limit).await?;
                if playlists.is_empty() {
                    println!("No playlists found.");
                }
                for playlist in &playlists {
                    let created = playlist.created_at.as_deref().unwrap_or("?");
                    println!(
                        "{:>10}  {}  (by {}, {})",
                        playlist.id, playlist.name, playlist.user, created
                    );
                }
            }
        }
        Ok::<_, anyhow::Error>(())
    })
}

/// Show one Freesound sound
pub fn cmd_track(rt: &Runtime, config: &Config, id: &str) -> anyhow::Result<()> {
    let client = FreesoundClient::new(
        http_client(config)?,
        config.sources.freesound.token.clone(),
    );

    match rt.block_on(client.track_by_id(id))? {
        Some(track) => {
            print_track(0, &track);
            println!("     license: {}", track.license);
            if !track.tags.is_empty() {
                println!("     tags:    {}", track.tags.join(", "));
            }
            if let Some(url) = &track.stream_url {
                println!("     stream:  {url}");
            }
        }
        None => println!("No Freesound sound with id {id}."),
    }
    Ok(())
}
