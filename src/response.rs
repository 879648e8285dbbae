//! Cached response value type.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// A response held by (or passing through) the cache gate.
///
/// Carries just enough of the origin's answer to replay it: status, content
/// type, and body. Everything else about the wire exchange is deliberately
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// HTTP status code the origin answered with.
    pub status: u16,
    /// `Content-Type` header value, if the origin sent one.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Bytes,
    /// When the body was fetched from the origin.
    pub fetched_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Creates a response stamped with the current time.
    #[must_use]
    pub fn new(status: u16, content_type: Option<String>, body: Bytes) -> Self {
        Self {
            status,
            content_type,
            body,
            fetched_at: Utc::now(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.body.len() as u64
    }

    /// Returns `true` if the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// SHA-256 digest of the body, hex-encoded.
    ///
    /// Stored alongside persisted entries and re-checked on read so a
    /// corrupted blob is never served as a cache hit.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.body);
        let hash = hasher.finalize();
        hash.iter().fold(String::with_capacity(64), |mut out, b| {
            use std::fmt::Write;
            let _ = write!(out, "{b:02x}");
            out
        })
    }
}
