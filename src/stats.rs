//! Install and resolve statistics types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Statistics for one completed install.
#[derive(Debug, Clone)]
pub struct InstallStats {
    /// Number of manifest assets cached.
    pub assets_cached: usize,
    /// Total bytes fetched and stored.
    pub total_bytes: u64,
    /// Wall-clock time the install took.
    pub elapsed: Duration,
}

impl InstallStats {
    /// Returns the average fetch rate in bytes per second.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn average_speed(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.total_bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

/// Running resolve counters for an active gate.
///
/// Updated from concurrent resolve calls, so everything is atomic; read a
/// coherent-enough view with [`GateStats::snapshot`].
#[derive(Debug, Default)]
pub struct GateStats {
    hits: AtomicU64,
    misses: AtomicU64,
    network_errors: AtomicU64,
}

impl GateStats {
    /// Creates zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            network_errors: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_network_error(&self) {
        self.network_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> GateStatsSnapshot {
        GateStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the resolve counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateStatsSnapshot {
    /// Requests answered from the cache.
    pub hits: u64,
    /// Requests that fell through to the network.
    pub misses: u64,
    /// Misses whose network fetch failed.
    pub network_errors: u64,
}

impl GateStatsSnapshot {
    /// Total resolved requests (hits + misses).
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of requests served from cache, or `None` before any traffic.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(self.hits as f64 / total as f64)
        }
    }
}
