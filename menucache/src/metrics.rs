//! Cache metrics tracking and reporting.
//!
//! Process-wide counters shared by every cache consumer: total requests,
//! hits, and the timestamp of the last memory-optimization pass. Rates are
//! derived on read and never stored. Counters accumulate for the life of the
//! session and reset only on explicit caller action.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared cache counters.
///
/// Increments are plain atomic adds; `record_hit` must only be called after
/// `record_request` for the same lookup, which keeps `cache_hits <=
/// total_requests` at every observable point.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    /// Milliseconds since epoch of the last optimization pass; 0 = never.
    last_cleanup_ms: AtomicU64,
}

impl CacheMetrics {
    /// Create a fresh metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one cache lookup.
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup that was served from cache (either tier).
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a memory-optimization pass completed.
    pub fn record_cleanup(&self, now_ms: u64) {
        self.last_cleanup_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Reset all counters. Only called by explicit caller action.
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.last_cleanup_ms.store(0, Ordering::Relaxed);
    }

    /// Cheap synchronous snapshot with derived rates.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let last_cleanup_ms = self.last_cleanup_ms.load(Ordering::Relaxed);

        let hit_rate_percent = if total_requests == 0 {
            0.0
        } else {
            cache_hits as f64 / total_requests as f64 * 100.0
        };

        MetricsSnapshot {
            total_requests,
            cache_hits,
            hit_rate_percent,
            miss_rate_percent: if total_requests == 0 {
                0.0
            } else {
                100.0 - hit_rate_percent
            },
            last_cleanup_ms: (last_cleanup_ms > 0).then_some(last_cleanup_ms),
        }
    }
}

/// Point-in-time view of the counters, with rates computed on read.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub hit_rate_percent: f64,
    pub miss_rate_percent: f64,
    /// Timestamp of the most recent optimization pass, if any ran.
    pub last_cleanup_ms: Option<u64>,
}

impl MetricsSnapshot {
    /// Format as a single human-readable line.
    pub fn format(&self) -> String {
        format!(
            "requests: {}, hits: {} ({:.1}%), misses: {:.1}%",
            self.total_requests, self.cache_hits, self.hit_rate_percent, self.miss_rate_percent
        )
    }
}
