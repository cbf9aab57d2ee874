//! Aggregated catalog commands.

use tokio::runtime::Runtime;

use super::print_track;
use crate::catalog::{AggregatorService, Limit};
use crate::config::Config;

fn service(config: &Config) -> anyhow::Result<AggregatorService> {
    Ok(AggregatorService::from_config(config)?)
}

/// Fetch one page from the first source with results
pub fn cmd_tracks(rt: &Runtime, config: &Config, limit: usize, offset: usize) -> anyhow::Result<()> {
    let service = service(config)?;
    let tracks = rt.block_on(service.get_tracks(limit, offset));

    if tracks.is_empty() {
        println!("No tracks available right now (all sources empty or out of budget).");
        return Ok(());
    }

    println!("{} tracks from {}:", tracks.len(), tracks[0].source.display_name());
    for (i, track) in tracks.iter().enumerate() {
        print_track(offset + i, track);
    }
    Ok(())
}

/// Build and print a shuffled mix across sources
pub fn cmd_mix(rt: &Runtime, config: &Config, per_source: usize) -> anyhow::Result<()> {
    let service = service(config)?;
    let tracks = rt.block_on(service.create_mixed_playlist(per_source));

    if tracks.is_empty() {
        println!("No tracks available right now.");
        return Ok(());
    }

    println!("Mixed playlist ({} tracks):", tracks.len());
    for (i, track) in tracks.iter().enumerate() {
        print_track(i, track);
    }
    Ok(())
}

/// Pull `count` tracks through the endless playlist
pub fn cmd_next(rt: &Runtime, config: &Config, count: usize) -> anyhow::Result<()> {
    let service = service(config)?;

    rt.block_on(async {
        for i in 0..count {
            match service.get_next_track().await {
                Some(track) => {
                    print_track(i, &track);
                    if let Some(url) = &track.stream_url {
                        println!("       {url}");
                    }
                }
                None => {
                    println!("No tracks available right now.");
                    break;
                }
            }
        }
    });
    Ok(())
}

/// Search all sources, grouped by source
pub fn cmd_search(rt: &Runtime, config: &Config, query: &str, limit: usize) -> anyhow::Result<()> {
    let service = service(config)?;
    let groups = rt.block_on(service.search(query, limit));

    if groups.is_empty() {
        println!("No results for \"{query}\".");
        return Ok(());
    }

    for group in &groups {
        println!("\n{} ({} results)", group.source.display_name(), group.tracks.len());
        for (i, track) in group.tracks.iter().enumerate() {
            print_track(i, track);
        }
    }
    Ok(())
}

/// Print the budget table
pub fn cmd_status(config: &Config) -> anyhow::Result<()> {
    let service = service(config)?;

    println!("{:<12} {:>8} {:>10} {:>10}  {:<9} resets", "source", "used", "limit", "remaining", "status");
    for (source, status) in service.get_rate_limit_status() {
        let remaining = status
            .remaining
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let state = if status.available { "✓ ready" } else { "✗ spent" };
        let limit = match status.limit {
            Limit::Limited(n) => n.to_string(),
            Limit::Unlimited => "∞".to_string(),
        };
        println!(
            "{:<12} {:>8} {:>10} {:>10}  {:<9} {}",
            source.display_name(),
            status.used,
            limit,
            remaining,
            state,
            status.reset_time.format("%Y-%m-%d %H:%M UTC")
        );
    }

    let order: Vec<&str> = service.fallback_order().iter().map(|s| s.as_str()).collect();
    println!("\nFallback order: {}", order.join(" → "));
    Ok(())
}

/// Hit every source once and report
pub fn cmd_probe(rt: &Runtime, config: &Config, limit: usize) -> anyhow::Result<()> {
    let service = service(config)?;
    let reports = rt.block_on(service.probe(limit));

    let mut healthy = 0;
    for report in &reports {
        let millis = report.elapsed.as_millis();
        if report.ok() {
            healthy += 1;
            println!(
                "✓ {:<12} {} tracks in {}ms",
                report.source.display_name(),
                report.track_count,
                millis
            );
            if let Some(sample) = &report.sample {
                println!("    e.g. {} - {}", sample.artist, sample.name);
            }
        } else {
            println!("✗ {:<12} no tracks ({}ms)", report.source.display_name(), millis);
        }
    }

    println!("\n{healthy}/{} sources returned tracks.", reports.len());
    Ok(())
}
