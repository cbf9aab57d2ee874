//! Jamendo API integration
//!
//! Primary source: Creative Commons music with direct mp3 streams.
//!
//! API docs: https://developer.jamendo.com/v3.0

pub mod dto;
mod adapter;
mod client;

pub use client::JamendoClient;
