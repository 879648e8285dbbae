//! The fixed asset manifest pre-cached at install time.

use std::collections::HashSet;
use std::slice;

use crate::key::RequestKey;

/// Cache bucket name for the current Goat Manager deployment.
///
/// Bumping the version suffix on redeploy is the only supported way to
/// invalidate previously pre-cached assets; old buckets stay on disk until
/// swept.
pub const DEFAULT_CACHE_NAME: &str = "goat-manager-v1";

/// Asset paths shipped with the Goat Manager deployment.
pub const GOAT_MANAGER_ASSETS: [&str; 5] = [
    "/",
    "/static/css/style.css",
    "/static/js/script.js",
    "/static/icons/icon-192.png",
    "/static/manifest.json",
];

/// An ordered, deduplicated list of paths guaranteed to be available offline
/// after a successful install.
///
/// The list is fixed at construction; the gate never grows it at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    entries: Vec<RequestKey>,
}

impl AssetManifest {
    /// Builds a manifest from raw paths, normalizing each and dropping
    /// duplicates while preserving first-seen order.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let entries = paths
            .into_iter()
            .map(|p| RequestKey::new(p.as_ref()))
            .filter(|key| seen.insert(key.clone()))
            .collect();
        Self { entries }
    }

    /// The manifest baked into this deployment.
    #[must_use]
    pub fn goat_manager() -> Self {
        Self::new(GOAT_MANAGER_ASSETS)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `key` is part of the manifest.
    #[must_use]
    pub fn contains(&self, key: &RequestKey) -> bool {
        self.entries.contains(key)
    }

    /// Iterates entries in manifest order.
    pub fn iter(&self) -> slice::Iter<'_, RequestKey> {
        self.entries.iter()
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self::goat_manager()
    }
}

impl<'a> IntoIterator for &'a AssetManifest {
    type Item = &'a RequestKey;
    type IntoIter = slice::Iter<'a, RequestKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_manifest_has_five_entries() {
        let manifest = AssetManifest::goat_manager();
        assert_eq!(manifest.len(), 5);
        assert!(manifest.contains(&RequestKey::new("/")));
        assert!(manifest.contains(&RequestKey::new("/static/css/style.css")));
        assert!(manifest.contains(&RequestKey::new("/static/js/script.js")));
        assert!(manifest.contains(&RequestKey::new("/static/icons/icon-192.png")));
        assert!(manifest.contains(&RequestKey::new("/static/manifest.json")));
    }

    #[test]
    fn duplicates_dropped_order_preserved() {
        let manifest = AssetManifest::new(["/a", "/b", "/a", "/c", "/b"]);
        let keys: Vec<&str> = manifest.iter().map(RequestKey::as_str).collect();
        assert_eq!(keys, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn entries_are_normalized() {
        let manifest = AssetManifest::new(["static/app.js", "/static/app.js#v2"]);
        // Both normalize to the same key, so only one entry survives.
        assert_eq!(manifest.len(), 1);
        assert!(manifest.contains(&RequestKey::new("/static/app.js")));
    }

    #[test]
    fn empty_manifest() {
        let manifest = AssetManifest::new(Vec::<String>::new());
        assert!(manifest.is_empty());
        assert_eq!(manifest.len(), 0);
    }
}
