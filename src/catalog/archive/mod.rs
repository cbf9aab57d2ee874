//! Archive.org integration
//!
//! Public-domain audio from the `opensource_audio` collection.

pub mod dto;
mod adapter;
mod client;

pub use adapter::MAX_FILES_PER_ITEM;
pub use client::ArchiveClient;
