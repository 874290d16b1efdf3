//! Composed diagnostics snapshot.
//!
//! Read-only view over metrics, storage usage, the strategy table, the
//! online flag, and the background-refresh queue depth. Computing a snapshot
//! has no side effects on any counter.

use crate::metrics::MetricsSnapshot;
use crate::store::StorageUsage;
use crate::strategy::{CacheStrategy, DataKind};

/// Strategy table row for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyInfo {
    pub kind: DataKind,
    pub priority: u8,
    pub ttl_ms: u64,
    pub background_refresh: bool,
}

impl StrategyInfo {
    pub fn new(kind: DataKind, strategy: CacheStrategy) -> Self {
        Self {
            kind,
            priority: strategy.priority,
            ttl_ms: strategy.ttl.as_millis() as u64,
            background_refresh: strategy.background_refresh,
        }
    }
}

/// Full diagnostics view returned by the coordinator.
#[derive(Debug, Clone)]
pub struct DiagnosticsSnapshot {
    pub metrics: MetricsSnapshot,
    pub storage: StorageUsage,
    pub memory_used_bytes: u64,
    pub memory_entry_count: usize,
    pub strategies: Vec<StrategyInfo>,
    pub online: bool,
    /// Background refreshes currently in flight.
    pub pending_refreshes: usize,
}

impl DiagnosticsSnapshot {
    /// Format as a human-readable report.
    pub fn format(&self) -> String {
        let quota = match self.storage.quota_bytes {
            Some(quota) => format!("{:.2} MB", quota as f64 / (1024.0 * 1024.0)),
            None => "unknown".to_string(),
        };

        let mut out = format!(
            r#"MenuCache Diagnostics

REQUESTS
  Total:       {}
  Hits:        {}
  Hit Rate:    {:.1}%

MEMORY TIER
  Entries:     {}
  Size:        {:.2} KB

PERSISTENT TIER
  Used:        {:.2} KB
  Quota:       {}

STATUS
  Online:      {}
  Refreshing:  {}
"#,
            self.metrics.total_requests,
            self.metrics.cache_hits,
            self.metrics.hit_rate_percent,
            self.memory_entry_count,
            self.memory_used_bytes as f64 / 1024.0,
            self.storage.used_bytes as f64 / 1024.0,
            quota,
            if self.online { "yes" } else { "no" },
            self.pending_refreshes,
        );

        out.push_str("\nSTRATEGIES\n");
        for info in &self.strategies {
            out.push_str(&format!(
                "  {:<22} priority={} ttl={}ms refresh={}\n",
                info.kind.to_string(),
                info.priority,
                info.ttl_ms,
                info.background_refresh
            ));
        }
        out
    }
}
