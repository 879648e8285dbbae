//! Error types for the goatherd library.

use thiserror::Error;

/// Errors that can occur while installing or resolving through the cache gate.
#[derive(Error, Debug)]
pub enum Error {
    /// Install aborted because a manifest asset could not be fetched.
    #[error("install failed: could not fetch {path}: {reason}")]
    Install {
        /// Manifest path that failed.
        path: String,
        /// Why the fetch failed.
        reason: String,
    },

    /// Install aborted because the origin answered a manifest path with a
    /// non-success status.
    #[error("install failed: {path} returned HTTP {status}")]
    AssetStatus {
        /// Manifest path that failed.
        path: String,
        /// HTTP status the origin returned.
        status: u16,
    },

    /// A request was resolved before the gate finished installing.
    #[error("cache gate is not active; run install first")]
    NotActive,

    /// Network transport failure (DNS, connect, timeout) without a response.
    #[error("network error: {0}")]
    Network(String),

    /// A persisted cache bucket could not be read back.
    #[error("corrupt cache bucket {name}: {reason}")]
    CorruptBucket {
        /// Bucket (cache name) that failed to load.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// I/O error during store operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for goatherd operations.
pub type Result<T> = std::result::Result<T, Error>;
