//! Configuration types for the cache gate and the goatherd binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::manifest::{AssetManifest, DEFAULT_CACHE_NAME};
use crate::store::DiskStore;

/// Configuration for the cache gate itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Versioned bucket name; bump it on redeploy to invalidate old assets.
    pub cache_name: String,
    /// Concurrent origin fetches during the manifest pre-cache.
    pub concurrent_fetches: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            concurrent_fetches: 4,
        }
    }
}

impl GateConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache bucket name.
    #[must_use]
    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Sets the number of concurrent pre-cache fetches.
    #[must_use]
    pub const fn with_concurrent_fetches(mut self, concurrent: usize) -> Self {
        self.concurrent_fetches = concurrent;
        self
    }
}

/// Path configuration for bucket storage and config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory holding cache buckets (one subdirectory per cache name).
    pub bucket_root: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            bucket_root: DiskStore::default_root(),
        }
    }
}

/// Bind address for the serving front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Complete application configuration for the goatherd binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Origin the gate fetches assets from.
    pub origin: String,
    /// Paths pre-cached at install time. Empty means the built-in deployment
    /// manifest.
    pub manifest: Vec<String>,
    /// Gate configuration.
    pub gate: GateConfig,
    /// Path configuration.
    pub paths: PathConfig,
    /// Serving front-end configuration.
    pub serve: ServeConfig,
}

impl AppConfig {
    /// Default origin: the Goat Manager development server.
    pub const DEFAULT_ORIGIN: &'static str = "http://127.0.0.1:5000";

    /// Returns the default config file location
    /// (`$XDG_CONFIG_HOME/goatherd/goatherd.toml`).
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("goatherd")
            .join("goatherd.toml")
    }

    /// Loads configuration from the default location, falling back to
    /// defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing config file cannot be read or parsed.
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let config: Self = toml::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// Origin to fetch from, defaulting when unset.
    #[must_use]
    pub fn origin(&self) -> &str {
        if self.origin.is_empty() {
            Self::DEFAULT_ORIGIN
        } else {
            &self.origin
        }
    }

    /// The asset manifest this deployment pre-caches.
    #[must_use]
    pub fn asset_manifest(&self) -> AssetManifest {
        if self.manifest.is_empty() {
            AssetManifest::goat_manager()
        } else {
            AssetManifest::new(&self.manifest)
        }
    }
}
