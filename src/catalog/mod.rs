//! Music catalog aggregation - finds study music across several free catalogs.
//!
//! # Architecture
//!
//! Same layering for every provider:
//! - **Domain models** (`domain.rs`) - [`Track`] and friends, our types
//! - **API DTOs** (`jamendo/dto.rs`, ...) - exact response shapes, loosely typed
//! - **Adapters** - convert DTOs to [`Track`], defaulting anything missing
//! - **Clients** - HTTP clients returning `Result`
//! - **Traits** (`traits.rs`) - [`SourceAdapter`], the "empty list on failure" seam
//!
//! On top of the adapters:
//! - **Budget** - per-source daily quotas with lazy reset
//! - **Cache** - TTL'd query cache
//! - **Playlist** - cursor + unbiased shuffle
//! - **Service** - [`AggregatorService`], fallback and mixing
//!
//! # Usage
//!
//! ```ignore
//! let service = AggregatorService::from_config(&config)?;
//!
//! // One page from the first healthy source
//! let tracks = service.get_tracks(20, 0).await;
//!
//! // Endless shuffled stream across all sources
//! while let Some(track) = service.get_next_track().await {
//!     println!("{} - {}", track.artist, track.name);
//! }
//! ```

pub mod archive;
pub mod budget;
pub mod cache;
pub mod domain;
pub mod freesound;
pub mod http;
pub mod jamendo;
mod lenient;
pub mod playlist;
pub mod service;
pub mod traits;
pub mod youtube;

pub use budget::{BudgetStatus, Limit, RateBudgetTracker};
pub use domain::{CatalogError, CatalogPlaylist, SourceKind, Track};
pub use service::{AggregatorService, ProbeReport, SearchGroup};
pub use traits::SourceAdapter;
