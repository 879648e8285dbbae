//! Disk-backed cache buckets.
//!
//! One bucket per cache name under the data root. Bodies are stored as
//! content-addressed blob files; entry metadata lives in an `index.toml`
//! written atomically (write tmp + rename) so a crash mid-save never leaves a
//! half-written index. Blob integrity is re-checked against the recorded
//! SHA-256 digest on every read.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use super::{CacheStore, EntrySummary};
use crate::error::{Error, Result};
use crate::key::RequestKey;
use crate::response::CachedResponse;

const INDEX_FILE: &str = "index.toml";

/// Hex-encoded SHA-256 of `bytes`.
fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().iter().fold(String::with_capacity(64), |mut out, b| {
        use std::fmt::Write;
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Serialized metadata for one cached entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    file: String,
    status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    size: u64,
    digest: String,
    fetched_at: DateTime<Utc>,
}

/// On-disk shape of `index.toml`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BucketIndex {
    #[serde(default)]
    entries: BTreeMap<String, IndexEntry>,
}

/// A persistent cache bucket rooted at `<root>/<cache-name>/`.
#[derive(Debug)]
pub struct DiskStore {
    name: String,
    dir: PathBuf,
    index: Mutex<HashMap<RequestKey, IndexEntry>>,
}

impl DiskStore {
    /// Returns the directory under which buckets are stored.
    ///
    /// Uses `STATE_DIRECTORY` (set by systemd when `StateDirectory=` is
    /// configured), falling back to `$XDG_DATA_HOME/goatherd` for interactive
    /// use.
    #[must_use]
    pub fn default_root() -> PathBuf {
        if let Ok(state_dir) = std::env::var("STATE_DIRECTORY") {
            PathBuf::from(state_dir).join("buckets")
        } else {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("goatherd")
                .join("buckets")
        }
    }

    /// Opens (or creates) the bucket for `name` under `root`, loading any
    /// existing index.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket name is not a plain directory name, the
    /// directory cannot be created, or an existing index fails to parse.
    pub async fn open(root: &Path, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid cache name: {name:?}"),
            )));
        }

        let dir = root.join(name);
        tokio::fs::create_dir_all(&dir).await?;

        let index_path = dir.join(INDEX_FILE);
        let entries = match tokio::fs::read_to_string(&index_path).await {
            Ok(contents) => {
                let index: BucketIndex =
                    toml::from_str(&contents).map_err(|e| Error::CorruptBucket {
                        name: name.to_string(),
                        reason: e.to_string(),
                    })?;
                index
                    .entries
                    .into_iter()
                    .map(|(key, entry)| (RequestKey::new(&key), entry))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(Error::Io(e)),
        };

        Ok(Self {
            name: name.to_string(),
            dir,
            index: Mutex::new(entries),
        })
    }

    /// Lists bucket names under `root`, sorted. A missing root is an empty
    /// list.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be read.
    pub async fn list_buckets(root: &Path) -> std::io::Result<Vec<String>> {
        let mut read_dir = match tokio::fs::read_dir(root).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes every bucket under `root` except `current`, returning the
    /// removed names sorted.
    ///
    /// This is the only deletion path in the crate; install and resolve never
    /// remove anything.
    ///
    /// # Errors
    ///
    /// Returns an error if a stale bucket cannot be removed.
    pub async fn sweep_stale(root: &Path, current: &str) -> std::io::Result<Vec<String>> {
        let mut removed = Vec::new();
        for name in Self::list_buckets(root).await? {
            if name != current {
                tokio::fs::remove_dir_all(root.join(&name)).await?;
                removed.push(name);
            }
        }
        Ok(removed)
    }

    /// Blob file name for a key: SHA-256 of the key string.
    fn blob_file(key: &RequestKey) -> String {
        format!("{}.bin", hex_sha256(key.as_str().as_bytes()))
    }

    /// Persists the index atomically while the caller holds the lock.
    async fn save_index(&self, entries: &HashMap<RequestKey, IndexEntry>) -> std::io::Result<()> {
        let index = BucketIndex {
            entries: entries
                .iter()
                .map(|(key, entry)| (key.as_str().to_string(), entry.clone()))
                .collect(),
        };

        let toml_str = toml::to_string(&index)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let path = self.dir.join(INDEX_FILE);
        let tmp_path = path.with_extension("toml.tmp");
        tokio::fs::write(&tmp_path, toml_str).await?;
        tokio::fs::rename(&tmp_path, &path).await
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &RequestKey) -> Option<CachedResponse> {
        let entry = self.index.lock().await.get(key).cloned()?;

        let blob_path = self.dir.join(&entry.file);
        let body = match tokio::fs::read(&blob_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("cache entry {key} unreadable ({e}); treating as miss");
                return None;
            }
        };

        if hex_sha256(&body) != entry.digest {
            log::warn!("cache entry {key} failed integrity check; treating as miss");
            return None;
        }

        Some(CachedResponse {
            status: entry.status,
            content_type: entry.content_type,
            body: body.into(),
            fetched_at: entry.fetched_at,
        })
    }

    async fn put(&self, key: RequestKey, response: CachedResponse) -> std::io::Result<()> {
        let file = Self::blob_file(&key);
        let blob_path = self.dir.join(&file);
        let tmp_path = blob_path.with_extension("bin.tmp");

        tokio::fs::write(&tmp_path, &response.body).await?;
        tokio::fs::rename(&tmp_path, &blob_path).await?;

        let entry = IndexEntry {
            file,
            status: response.status,
            content_type: response.content_type.clone(),
            size: response.len(),
            digest: response.digest_hex(),
            fetched_at: response.fetched_at,
        };

        let mut entries = self.index.lock().await;
        entries.insert(key, entry);
        self.save_index(&entries).await
    }

    async fn contains(&self, key: &RequestKey) -> bool {
        self.index.lock().await.contains_key(key)
    }

    async fn len(&self) -> usize {
        self.index.lock().await.len()
    }

    async fn entries(&self) -> Vec<EntrySummary> {
        let mut summaries: Vec<EntrySummary> = self
            .index
            .lock()
            .await
            .iter()
            .map(|(key, entry)| EntrySummary {
                key: key.clone(),
                status: entry.status,
                content_type: entry.content_type.clone(),
                size: entry.size,
                fetched_at: entry.fetched_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        summaries
    }
}
