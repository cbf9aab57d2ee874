//! StudyBeats - study music from free catalogs, mixed into one endless stream.
//!
//! Pulls tracks from Jamendo, Freesound, Archive.org and YouTube behind
//! per-source daily budgets, keeps a local metadata store, and ships a small
//! upload server for self-hosted songs. Everything is driven from the CLI.

pub mod catalog;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_DIRECTIVES: [&str; 4] = ["studybeats=info", "catalog=info", "store=info", "server=info"];

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    let mut filter = EnvFilter::from_default_env();
    for directive in LOG_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    cli::run_command(&args)
}
