//! Envelope and error types for the persistent tier.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Serialized envelope for one persisted cache entry.
///
/// `stored_at_ms` is written together with the value; readers never observe
/// one without the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The cached payload.
    pub value: serde_json::Value,
    /// Milliseconds since epoch of the last successful write.
    pub stored_at_ms: u64,
}

impl StoredEntry {
    /// Create an envelope stamped at the given time.
    pub fn new(value: serde_json::Value, stored_at_ms: u64) -> Self {
        Self {
            value,
            stored_at_ms,
        }
    }

    /// Approximate byte size of the serialized envelope.
    pub fn size_estimate(&self) -> u64 {
        serde_json::to_vec(self).map(|v| v.len() as u64).unwrap_or(0)
    }
}

/// Metadata for one stored entry, as reported by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntryMeta {
    /// Full storage key, including the namespace prefix.
    pub key: String,
    /// Write timestamp from the envelope.
    pub stored_at_ms: u64,
    /// Size of the serialized envelope in bytes.
    pub size_bytes: u64,
}

/// Best-effort storage usage report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    /// Bytes currently used by stored entries.
    pub used_bytes: u64,
    /// Configured or host-reported capacity. `None` means the environment
    /// cannot report a quota; callers must not read that as "plenty of room".
    pub quota_bytes: Option<u64>,
}

impl StorageUsage {
    /// Usage as a fraction of quota, if the quota is known.
    pub fn used_fraction(&self) -> Option<f64> {
        self.quota_bytes
            .filter(|q| *q > 0)
            .map(|q| self.used_bytes as f64 / q as f64)
    }
}

/// Failures the persistent tier can report to its caller.
///
/// Read-side problems never surface here; they are repaired locally.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would exceed the configured capacity. The caller should
    /// evict and retry once.
    #[error("store quota exceeded: used={used_bytes}, quota={quota_bytes}")]
    QuotaExceeded { used_bytes: u64, quota_bytes: u64 },

    /// I/O error talking to the backing storage.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The entry could not be serialized.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
