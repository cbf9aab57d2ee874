//! Metadata store commands.

use std::path::Path;

use anyhow::bail;
use tokio::runtime::Runtime;

use super::{LibraryAction, print_track};
use crate::catalog::AggregatorService;
use crate::config::Config;
use crate::error::ResultExt;
use crate::store::{MetadataStore, SqliteMetadataStore, StoredTrack};

async fn open_store(path: &Path) -> crate::error::Result<SqliteMetadataStore> {
    SqliteMetadataStore::open(path)
        .await
        .with_context(format!("opening metadata store {}", path.display()))
}

fn print_stored(tracks: &[StoredTrack]) {
    if tracks.is_empty() {
        println!("No tracks.");
    }
    for (i, stored) in tracks.iter().enumerate() {
        print_track(i, &stored.track);
        println!(
            "       {}  plays: {}  quality: {}",
            stored.track.id, stored.play_count, stored.quality
        );
    }
}

/// Build a mix and save every track to the store
pub fn cmd_sync(
    rt: &Runtime,
    config: &Config,
    per_source: usize,
    db: Option<&Path>,
) -> anyhow::Result<()> {
    let db_path = db.unwrap_or(config.store.database_path.as_path());
    let service = AggregatorService::from_config(config)?;

    rt.block_on(async {
        let store = open_store(db_path).await?;
        println!("Syncing into {}", db_path.display());

        let saved = service.sync_to_store(&store, per_source).await;
        if saved.is_empty() {
            println!("Nothing saved (no tracks available).");
            return Ok(());
        }

        let mut by_quality = std::collections::BTreeMap::new();
        for stored in &saved {
            *by_quality.entry(stored.quality.as_str()).or_insert(0usize) += 1;
        }
        println!("✓ Saved {} tracks", saved.len());
        for (quality, count) in by_quality {
            println!("    {quality:<9} {count}");
        }
        Ok::<_, anyhow::Error>(())
    })
}

/// Read from or curate the metadata store
pub fn cmd_library(
    rt: &Runtime,
    config: &Config,
    action: &LibraryAction,
    db: Option<&Path>,
) -> anyhow::Result<()> {
    let db_path = db.unwrap_or(config.store.database_path.as_path());

    rt.block_on(async {
        let store = open_store(db_path).await?;
        match action {
            LibraryAction::Popular { limit } => print_stored(&store.popular(*limit).await?),
            LibraryAction::Find { term, limit } => {
                print_stored(&store.search(term, *limit).await?)
            }
            LibraryAction::Source { source, limit } => {
                print_stored(&store.list_by_source(*source, *limit).await?)
            }
            LibraryAction::Played { id } => {
                if !store.increment_play_count(id).await? {
                    bail!("No stored track with id {id}");
                }
                if let Some(stored) = store.get(id).await? {
                    println!("✓ {} now has {} plays", stored.track.name, stored.play_count);
                }
            }
            LibraryAction::Hide { id, show } => {
                if !store.set_availability(id, *show).await? {
                    bail!("No stored track with id {id}");
                }
                let state = if *show { "visible" } else { "hidden" };
                println!("✓ {id} is now {state}");
            }
            LibraryAction::CreatePlaylist {
                name,
                track_ids,
                description,
            } => {
                let playlist = store
                    .create_playlist(name, description.as_deref(), track_ids)
                    .await?;
                println!(
                    "✓ Created playlist {} ({} tracks)",
                    playlist.id,
                    playlist.track_ids.len()
                );
            }
            LibraryAction::Playlist { id } => print_stored(&store.playlist_tracks(id).await?),
        }
        Ok::<_, anyhow::Error>(())
    })
}
