//! Command-line interface for studybeats.
//!
//! Fetches and mixes tracks from the remote catalogs, maintains the local
//! metadata store, and runs (or talks to) the upload server.

mod commands;

pub use commands::{Cli, Commands, run_command};
