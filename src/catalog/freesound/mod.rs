//! Freesound API integration
//!
//! Sound-effects archive; mostly short loops and ambiences with mp3 previews.
//!
//! API docs: https://freesound.org/docs/api/

pub mod dto;
mod adapter;
mod client;

pub use client::FreesoundClient;
