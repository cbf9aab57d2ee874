//! YouTube Data API integration
//!
//! Last-resort source: plenty of content, but streams are watch-page URLs and
//! the daily quota is tiny.

pub mod dto;
mod adapter;
mod client;

pub use client::YouTubeClient;
