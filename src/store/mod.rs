//! Cache store abstraction and implementations.
//!
//! The gate only ever sees the [`CacheStore`] trait: a key→response mapping
//! scoped to one version-named bucket. [`MemoryStore`] backs tests and
//! throwaway runs; [`DiskStore`] persists buckets under the data directory.

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::key::RequestKey;
use crate::response::CachedResponse;

/// One version-named cache bucket.
///
/// Lookups are concurrent-safe; the gate writes only during install, so
/// implementations never see a write racing a write.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Bucket name this store is scoped to.
    fn name(&self) -> &str;

    /// Looks up a cached response. A corrupt or unreadable entry is a miss.
    async fn get(&self, key: &RequestKey) -> Option<CachedResponse>;

    /// Inserts or overwrites an entry.
    async fn put(&self, key: RequestKey, response: CachedResponse) -> std::io::Result<()>;

    /// Returns `true` if an entry exists for `key`.
    async fn contains(&self, key: &RequestKey) -> bool;

    /// Number of entries in the bucket.
    async fn len(&self) -> usize;

    /// Returns `true` if the bucket holds no entries.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Per-entry metadata, sorted by key, for introspection.
    async fn entries(&self) -> Vec<EntrySummary>;
}

/// Metadata about one cached entry, as reported by `entries`.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    /// Request key the entry is stored under.
    pub key: RequestKey,
    /// Cached HTTP status.
    pub status: u16,
    /// Cached `Content-Type`, if any.
    pub content_type: Option<String>,
    /// Body size in bytes.
    pub size: u64,
    /// When the entry was fetched from the origin.
    pub fetched_at: DateTime<Utc>,
}

impl EntrySummary {
    pub(crate) fn from_response(key: RequestKey, response: &CachedResponse) -> Self {
        Self {
            key,
            status: response.status,
            content_type: response.content_type.clone(),
            size: response.len(),
            fetched_at: response.fetched_at,
        }
    }
}
