//! Request key normalization.
//!
//! The cache is keyed by request identity. Incoming identities arrive in
//! several shapes (absolute URL, bare path, path with fragment); all of them
//! normalize to a same-origin path so that a pre-cached `/static/js/script.js`
//! matches however the page asked for it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized identity of an intercepted request.
///
/// Always starts with `/`, keeps the query string, and never carries a
/// fragment or an authority. Construction via [`RequestKey::new`] is the only
/// way to obtain one, so any two keys for the same resource compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    /// Normalizes a raw request identity into a key.
    ///
    /// Accepts absolute `http(s)://host/path` URLs (the authority is dropped;
    /// the gate is same-origin by construction) and bare paths. Fragments are
    /// stripped, an empty path becomes `/`, and a missing leading slash is
    /// added.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let mut s = raw.trim();

        // Drop scheme + authority from absolute URLs.
        for scheme in ["https://", "http://"] {
            if let Some(rest) = s.strip_prefix(scheme) {
                s = rest.find('/').map_or("", |idx| &rest[idx..]);
                break;
            }
        }

        // The fragment never reaches the server and never keys the cache.
        if let Some(idx) = s.find('#') {
            s = &s[..idx];
        }

        if s.is_empty() {
            return Self("/".to_string());
        }
        if s.starts_with('/') {
            Self(s.to_string())
        } else {
            Self(format!("/{s}"))
        }
    }

    /// Returns the normalized path (plus query, if any) as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path portion without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.0.find('?').map_or(self.0.as_str(), |idx| &self.0[..idx])
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
