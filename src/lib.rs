//! goatherd - offline asset cache gate for the Goat Manager web app.
//!
//! Pre-populates a version-named cache bucket with a fixed asset manifest at
//! install time, then resolves asset requests cache-first with network
//! fallback. The gate never grows the cache at resolve time and never evicts;
//! superseding a deployment means bumping the cache name and (optionally)
//! sweeping the old bucket.
//!
//! # Example
//!
//! ```no_run
//! use goatherd::{AssetManifest, CacheGate, GateConfig, NoProgress, RequestKey};
//!
//! # async fn example() -> goatherd::Result<()> {
//! // Gate over an in-memory bucket, fetching from the local dev server.
//! let mut gate = CacheGate::new(GateConfig::default(), "http://127.0.0.1:5000")?;
//!
//! // Install: fetch and store every manifest asset, all-or-nothing.
//! gate.install(&AssetManifest::goat_manager(), &NoProgress).await?;
//!
//! // Resolve: cache-first, network fallback.
//! let page = gate.resolve(&RequestKey::new("/")).await?;
//! println!("served {} bytes ({})", page.response.len(), page.source.label());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod format;
pub mod gate;
pub mod key;
pub mod manifest;
pub mod net;
pub mod response;
pub mod stats;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "serve")]
pub mod serve;

// Re-export main types for convenience
pub use config::{AppConfig, GateConfig, PathConfig, ServeConfig};
pub use error::{Error, Result};
pub use format::{format_bytes, format_duration};
pub use gate::{CacheGate, FetchSource, GateState, InstallProgress, NoProgress, Resolution};
pub use key::RequestKey;
pub use manifest::{AssetManifest, DEFAULT_CACHE_NAME, GOAT_MANAGER_ASSETS};
pub use net::{HttpNetwork, Network};
pub use response::CachedResponse;
pub use stats::{GateStats, GateStatsSnapshot, InstallStats};
pub use store::{CacheStore, DiskStore, EntrySummary, MemoryStore};
