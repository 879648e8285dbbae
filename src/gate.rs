//! The offline cache gate: install-time pre-caching and cache-first resolve.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use futures::{StreamExt, stream};

use crate::config::GateConfig;
use crate::error::{Error, Result};
use crate::key::RequestKey;
use crate::manifest::AssetManifest;
use crate::net::{HttpNetwork, Network};
use crate::response::CachedResponse;
use crate::stats::{GateStats, GateStatsSnapshot, InstallStats};
use crate::store::{CacheStore, MemoryStore};

/// Lifecycle state of a gate instance.
///
/// A gate starts `Installing` and becomes `Active` only once the whole
/// manifest pre-cache has succeeded. There is no way back within one
/// instance; a new cache name is a new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Manifest pre-cache has not completed successfully yet.
    Installing,
    /// Pre-cache done; the gate answers resolve calls.
    Active,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installing => write!(f, "installing"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Served from the cache bucket; no network access occurred.
    Cache,
    /// Cache miss; fetched from the origin and passed through unmodified.
    Network,
}

impl FetchSource {
    /// Short label for headers and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cache => "hit",
            Self::Network => "miss",
        }
    }
}

/// A resolved request: the response plus where it came from.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The response to relay to the caller.
    pub response: CachedResponse,
    /// Cache hit or network fallback.
    pub source: FetchSource,
}

/// Trait for receiving install progress updates.
///
/// All methods have default no-op implementations for convenience.
pub trait InstallProgress: Send + Sync {
    /// Called once before any manifest fetch starts.
    fn on_install_start(&self, _total: usize) {}

    /// Called when one manifest asset has been fetched successfully.
    fn on_asset_fetched(&self, _key: &RequestKey, _bytes: u64) {}

    /// Called when one manifest asset failed to fetch.
    fn on_asset_failed(&self, _key: &RequestKey, _error: &str) {}

    /// Called after a successful install.
    fn on_install_complete(&self, _stats: &InstallStats) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl InstallProgress for NoProgress {}

/// Offline cache gate over a store and a network.
///
/// Pre-populates one version-named bucket from a fixed manifest at install
/// time, then resolves requests cache-first with network fallback. The gate
/// never writes to the store outside install and never deletes from it.
pub struct CacheGate<S: CacheStore = MemoryStore, N: Network = HttpNetwork> {
    config: GateConfig,
    store: S,
    network: N,
    state: GateState,
    stats: GateStats,
}

impl CacheGate {
    /// Creates a gate over an in-memory bucket and an HTTP network rooted at
    /// `origin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GateConfig, origin: &str) -> reqwest::Result<Self> {
        let store = MemoryStore::new(&config.cache_name);
        let network = HttpNetwork::new(origin)?;
        Ok(Self::with_parts(config, store, network))
    }
}

impl<S: CacheStore, N: Network> CacheGate<S, N> {
    /// Creates a gate with custom store and network implementations.
    #[must_use]
    pub const fn with_parts(config: GateConfig, store: S, network: N) -> Self {
        Self {
            config,
            store,
            network,
            state: GateState::Installing,
            stats: GateStats::new(),
        }
    }

    /// Returns the gate configuration.
    #[must_use]
    pub const fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// Cache bucket name this gate serves.
    #[must_use]
    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    /// Returns a reference to the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of the resolve counters.
    #[must_use]
    pub fn stats(&self) -> GateStatsSnapshot {
        self.stats.snapshot()
    }

    /// Pre-caches every manifest asset into the bucket.
    ///
    /// Fetches run concurrently (bounded by `concurrent_fetches`) and all of
    /// them must succeed; nothing is written unless the whole manifest
    /// fetched cleanly, so a failed install leaves the bucket untouched. Only
    /// after the write-back completes does the gate become active. Re-running
    /// install against a populated bucket re-fetches and overwrites in place.
    ///
    /// # Errors
    ///
    /// Returns the first failure in manifest order: transport errors as
    /// [`Error::Install`], non-success origin statuses as
    /// [`Error::AssetStatus`], and store write failures as [`Error::Io`].
    /// The gate stays (or becomes) inactive only if it was never activated;
    /// a previously successful install is not undone by a failed re-install.
    pub async fn install(
        &mut self,
        manifest: &AssetManifest,
        progress: &dyn InstallProgress,
    ) -> Result<InstallStats> {
        let started = Instant::now();
        progress.on_install_start(manifest.len());

        let network = &self.network;
        let results: Vec<(RequestKey, Result<CachedResponse>)> =
            stream::iter(manifest.iter().cloned())
                .map(|key| async move {
                    let result = network.fetch(&key).await;
                    (key, result)
                })
                .buffer_unordered(self.config.concurrent_fetches.max(1))
                .collect()
                .await;

        let mut fetched: HashMap<RequestKey, CachedResponse> =
            HashMap::with_capacity(results.len());
        let mut failures: HashMap<RequestKey, Error> = HashMap::new();

        for (key, result) in results {
            match result {
                Ok(response) if response.is_success() => {
                    progress.on_asset_fetched(&key, response.len());
                    fetched.insert(key, response);
                }
                Ok(response) => {
                    progress.on_asset_failed(&key, &format!("HTTP {}", response.status));
                    failures.insert(
                        key.clone(),
                        Error::AssetStatus {
                            path: key.to_string(),
                            status: response.status,
                        },
                    );
                }
                Err(e) => {
                    progress.on_asset_failed(&key, &e.to_string());
                    failures.insert(
                        key.clone(),
                        Error::Install {
                            path: key.to_string(),
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }

        // Report the first failure in manifest order so the error is
        // deterministic regardless of fetch completion order.
        for key in manifest {
            if let Some(error) = failures.remove(key) {
                log::error!("install failed: {error}");
                return Err(error);
            }
        }

        let mut assets_cached = 0;
        let mut total_bytes = 0;
        for key in manifest {
            if let Some(response) = fetched.remove(key) {
                total_bytes += response.len();
                self.store.put(key.clone(), response).await?;
                assets_cached += 1;
            }
        }

        self.state = GateState::Active;
        let stats = InstallStats {
            assets_cached,
            total_bytes,
            elapsed: started.elapsed(),
        };
        log::info!(
            "installed {} asset(s) into {}",
            stats.assets_cached,
            self.config.cache_name
        );
        progress.on_install_complete(&stats);
        Ok(stats)
    }

    /// Resolves one request: cache-first, network fallback.
    ///
    /// A hit answers from the bucket with zero network access. A miss
    /// performs exactly one origin fetch and relays its result unmodified;
    /// the result is not written back into the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotActive`] before a successful install, or the
    /// network error when a miss's origin fetch fails.
    pub async fn resolve(&self, key: &RequestKey) -> Result<Resolution> {
        if self.state != GateState::Active {
            return Err(Error::NotActive);
        }

        if let Some(response) = self.store.get(key).await {
            self.stats.record_hit();
            log::debug!("cache hit: {key}");
            return Ok(Resolution {
                response,
                source: FetchSource::Cache,
            });
        }

        self.stats.record_miss();
        log::debug!("cache miss: {key}");
        match self.network.fetch(key).await {
            Ok(response) => Ok(Resolution {
                response,
                source: FetchSource::Network,
            }),
            Err(e) => {
                self.stats.record_network_error();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    /// A mock origin with scripted responses and a fetch counter.
    #[derive(Default)]
    struct MockNetwork {
        responses: Mutex<HashMap<RequestKey, CachedResponse>>,
        unreachable: Mutex<HashSet<RequestKey>>,
        calls: AtomicUsize,
    }

    impl MockNetwork {
        fn new() -> Self {
            Self::default()
        }

        fn serve(&self, path: &str, status: u16, body: &'static [u8]) {
            self.responses.lock().unwrap().insert(
                RequestKey::new(path),
                CachedResponse::new(status, Some("text/plain".to_string()), Bytes::from_static(body)),
            );
        }

        fn cut(&self, path: &str) {
            self.unreachable.lock().unwrap().insert(RequestKey::new(path));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl Network for MockNetwork {
        async fn fetch(&self, key: &RequestKey) -> Result<CachedResponse> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.unreachable.lock().unwrap().contains(key) {
                return Err(Error::Network(format!("connection refused: {key}")));
            }
            self.responses.lock().unwrap().get(key).cloned().map_or_else(
                || {
                    Ok(CachedResponse::new(
                        404,
                        Some("text/plain".to_string()),
                        Bytes::from_static(b"not found"),
                    ))
                },
                Ok,
            )
        }
    }

    fn deployment_network() -> MockNetwork {
        let net = MockNetwork::new();
        net.serve("/", 200, b"<html>goats</html>");
        net.serve("/static/css/style.css", 200, b"body { }");
        net.serve("/static/js/script.js", 200, b"console.log('goat')");
        net.serve("/static/icons/icon-192.png", 200, b"\x89PNG");
        net.serve("/static/manifest.json", 200, b"{\"name\":\"Goat Manager\"}");
        net
    }

    fn gate(net: MockNetwork) -> CacheGate<MemoryStore, MockNetwork> {
        let config = GateConfig::default();
        let store = MemoryStore::new(&config.cache_name);
        CacheGate::with_parts(config, store, net)
    }

    // --- install ---

    #[tokio::test]
    async fn install_caches_every_manifest_entry() {
        let mut gate = gate(deployment_network());
        let manifest = AssetManifest::goat_manager();

        let stats = gate.install(&manifest, &NoProgress).await.unwrap();

        assert_eq!(stats.assets_cached, 5);
        assert_eq!(gate.store().len().await, 5);
        for key in &manifest {
            assert!(gate.store().contains(key).await);
        }
    }

    #[tokio::test]
    async fn install_activates_the_gate() {
        let mut gate = gate(deployment_network());
        assert_eq!(gate.state(), GateState::Installing);

        gate.install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap();

        assert_eq!(gate.state(), GateState::Active);
    }

    #[tokio::test]
    async fn install_fails_when_one_asset_is_unreachable() {
        let net = deployment_network();
        net.cut("/static/js/script.js");
        let mut gate = gate(net);

        let err = gate
            .install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Install { .. }));
        assert_eq!(gate.state(), GateState::Installing);
    }

    #[tokio::test]
    async fn install_fails_on_missing_asset() {
        let net = deployment_network();
        // A manifest path the origin does not serve answers 404.
        let manifest = AssetManifest::new([
            "/",
            "/static/css/style.css",
            "/static/css/deleted.css",
        ]);
        let mut gate = gate(net);

        let err = gate.install(&manifest, &NoProgress).await.unwrap_err();

        match err {
            Error::AssetStatus { path, status } => {
                assert_eq!(path, "/static/css/deleted.css");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn failed_install_writes_nothing() {
        let net = deployment_network();
        net.cut("/static/manifest.json");
        let mut gate = gate(net);

        let _ = gate
            .install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap_err();

        assert!(gate.store().is_empty().await);
    }

    #[tokio::test]
    async fn install_error_is_first_in_manifest_order() {
        let net = deployment_network();
        net.cut("/static/css/style.css");
        net.cut("/static/manifest.json");
        let mut gate = gate(net);

        let err = gate
            .install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap_err();

        match err {
            Error::Install { path, .. } => assert_eq!(path, "/static/css/style.css"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn install_twice_is_idempotent() {
        let mut gate = gate(deployment_network());
        let manifest = AssetManifest::goat_manager();

        gate.install(&manifest, &NoProgress).await.unwrap();
        gate.install(&manifest, &NoProgress).await.unwrap();

        assert_eq!(gate.store().len().await, 5);
        assert_eq!(gate.state(), GateState::Active);
        for key in &manifest {
            assert!(gate.store().contains(key).await);
        }
    }

    #[tokio::test]
    async fn install_empty_manifest_activates() {
        let mut gate = gate(MockNetwork::new());
        let stats = gate
            .install(&AssetManifest::new(Vec::<String>::new()), &NoProgress)
            .await
            .unwrap();

        assert_eq!(stats.assets_cached, 0);
        assert_eq!(gate.state(), GateState::Active);
    }

    #[tokio::test]
    async fn install_totals_fetched_bytes() {
        let net = MockNetwork::new();
        net.serve("/a", 200, b"12345");
        net.serve("/b", 200, b"123");
        let mut gate = gate(net);

        let stats = gate
            .install(&AssetManifest::new(["/a", "/b"]), &NoProgress)
            .await
            .unwrap();

        assert_eq!(stats.assets_cached, 2);
        assert_eq!(stats.total_bytes, 8);
    }

    #[tokio::test]
    async fn install_reports_progress() {
        #[derive(Default)]
        struct Recorder {
            started: AtomicUsize,
            fetched: AtomicUsize,
            completed: AtomicUsize,
        }
        impl InstallProgress for Recorder {
            fn on_install_start(&self, total: usize) {
                self.started.store(total, Ordering::Relaxed);
            }
            fn on_asset_fetched(&self, _key: &RequestKey, _bytes: u64) {
                self.fetched.fetch_add(1, Ordering::Relaxed);
            }
            fn on_install_complete(&self, _stats: &InstallStats) {
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
        }

        let recorder = Recorder::default();
        let mut gate = gate(deployment_network());
        gate.install(&AssetManifest::goat_manager(), &recorder)
            .await
            .unwrap();

        assert_eq!(recorder.started.load(Ordering::Relaxed), 5);
        assert_eq!(recorder.fetched.load(Ordering::Relaxed), 5);
        assert_eq!(recorder.completed.load(Ordering::Relaxed), 1);
    }

    // --- resolve ---

    #[tokio::test]
    async fn resolve_before_install_is_rejected() {
        let gate = gate(deployment_network());
        let err = gate.resolve(&RequestKey::new("/")).await.unwrap_err();
        assert!(matches!(err, Error::NotActive));
        assert_eq!(gate.network.calls(), 0);
    }

    #[tokio::test]
    async fn hit_serves_from_cache_without_network() {
        let mut gate = gate(deployment_network());
        gate.install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap();
        let calls_after_install = gate.network.calls();

        let resolution = gate
            .resolve(&RequestKey::new("/static/css/style.css"))
            .await
            .unwrap();

        assert_eq!(resolution.source, FetchSource::Cache);
        assert_eq!(resolution.response.body, Bytes::from_static(b"body { }"));
        // Zero network calls for a hit.
        assert_eq!(gate.network.calls(), calls_after_install);
    }

    #[tokio::test]
    async fn every_precached_asset_is_a_hit() {
        let mut gate = gate(deployment_network());
        let manifest = AssetManifest::goat_manager();
        gate.install(&manifest, &NoProgress).await.unwrap();
        let calls_after_install = gate.network.calls();

        for key in &manifest {
            let resolution = gate.resolve(key).await.unwrap();
            assert_eq!(resolution.source, FetchSource::Cache, "{key} missed");
        }
        assert_eq!(gate.network.calls(), calls_after_install);
    }

    #[tokio::test]
    async fn miss_falls_back_to_exactly_one_network_fetch() {
        let net = deployment_network();
        net.serve("/goats/7", 200, b"<html>goat #7</html>");
        let mut gate = gate(net);
        gate.install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap();
        let calls_after_install = gate.network.calls();

        let resolution = gate.resolve(&RequestKey::new("/goats/7")).await.unwrap();

        assert_eq!(resolution.source, FetchSource::Network);
        assert_eq!(resolution.response.body, Bytes::from_static(b"<html>goat #7</html>"));
        assert_eq!(gate.network.calls(), calls_after_install + 1);
    }

    #[tokio::test]
    async fn miss_result_passes_through_unmodified() {
        let net = deployment_network();
        net.serve("/gone", 410, b"gone for good");
        let mut gate = gate(net);
        gate.install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap();

        let resolution = gate.resolve(&RequestKey::new("/gone")).await.unwrap();

        // Error statuses relay as-is; the gate adds no fallback page.
        assert_eq!(resolution.response.status, 410);
        assert_eq!(resolution.response.body, Bytes::from_static(b"gone for good"));
    }

    #[tokio::test]
    async fn miss_is_not_written_back() {
        let net = deployment_network();
        net.serve("/goats/7", 200, b"<html>goat #7</html>");
        let mut gate = gate(net);
        gate.install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap();
        let entries_before = gate.store().len().await;

        gate.resolve(&RequestKey::new("/goats/7")).await.unwrap();
        gate.resolve(&RequestKey::new("/goats/7")).await.unwrap();

        // Static manifest only: the bucket never grows at resolve time.
        assert_eq!(gate.store().len().await, entries_before);
        assert!(!gate.store().contains(&RequestKey::new("/goats/7")).await);
    }

    #[tokio::test]
    async fn miss_network_failure_propagates() {
        let net = deployment_network();
        net.cut("/flaky");
        let mut gate = gate(net);
        gate.install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap();

        let err = gate.resolve(&RequestKey::new("/flaky")).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn resolve_counters_track_traffic() {
        let net = deployment_network();
        net.serve("/goats", 200, b"herd");
        net.cut("/flaky");
        let mut gate = gate(net);
        gate.install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap();

        gate.resolve(&RequestKey::new("/")).await.unwrap();
        gate.resolve(&RequestKey::new("/goats")).await.unwrap();
        let _ = gate.resolve(&RequestKey::new("/flaky")).await;

        let snap = gate.stats();
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 2);
        assert_eq!(snap.network_errors, 1);
    }

    #[tokio::test]
    async fn equivalent_identities_hit_the_same_entry() {
        let mut gate = gate(deployment_network());
        gate.install(&AssetManifest::goat_manager(), &NoProgress)
            .await
            .unwrap();

        // An absolute same-origin URL normalizes onto the pre-cached path.
        let resolution = gate
            .resolve(&RequestKey::new("https://goats.example.com/static/js/script.js"))
            .await
            .unwrap();
        assert_eq!(resolution.source, FetchSource::Cache);
    }

    #[test]
    fn no_progress_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoProgress>();
    }

    #[test]
    fn fetch_source_labels() {
        assert_eq!(FetchSource::Cache.label(), "hit");
        assert_eq!(FetchSource::Network.label(), "miss");
    }

    #[test]
    fn gate_state_display() {
        assert_eq!(GateState::Installing.to_string(), "installing");
        assert_eq!(GateState::Active.to_string(), "active");
    }
}
