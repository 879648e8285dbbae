//! In-memory cache bucket.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CacheStore, EntrySummary};
use crate::key::RequestKey;
use crate::response::CachedResponse;

/// A cache bucket that lives and dies with the process.
///
/// Same semantics as [`DiskStore`](super::DiskStore), minus durability.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    entries: Mutex<HashMap<RequestKey, CachedResponse>>,
}

impl MemoryStore {
    /// Creates an empty bucket with the given cache name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &RequestKey) -> Option<CachedResponse> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn put(&self, key: RequestKey, response: CachedResponse) -> std::io::Result<()> {
        self.entries.lock().await.insert(key, response);
        Ok(())
    }

    async fn contains(&self, key: &RequestKey) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    async fn entries(&self) -> Vec<EntrySummary> {
        let mut summaries: Vec<EntrySummary> = self
            .entries
            .lock()
            .await
            .iter()
            .map(|(key, response)| EntrySummary::from_response(key.clone(), response))
            .collect();
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn resp(body: &'static [u8]) -> CachedResponse {
        CachedResponse::new(200, Some("text/plain".to_string()), Bytes::from_static(body))
    }

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryStore::new("goat-manager-v1");
        let key = RequestKey::new("/static/css/style.css");
        store.put(key.clone(), resp(b"body { }")).await.unwrap();

        let found = store.get(&key).await.unwrap();
        assert_eq!(found.body, Bytes::from_static(b"body { }"));
        assert!(store.contains(&key).await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = MemoryStore::new("goat-manager-v1");
        assert!(store.get(&RequestKey::new("/nope")).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn put_overwrites() {
        let store = MemoryStore::new("goat-manager-v1");
        let key = RequestKey::new("/");
        store.put(key.clone(), resp(b"old")).await.unwrap();
        store.put(key.clone(), resp(b"new")).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(&key).await.unwrap().body, Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn entries_sorted_by_key() {
        let store = MemoryStore::new("goat-manager-v1");
        store.put(RequestKey::new("/b"), resp(b"b")).await.unwrap();
        store.put(RequestKey::new("/a"), resp(b"a")).await.unwrap();

        let entries = store.entries().await;
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["/a", "/b"]);
    }
}
