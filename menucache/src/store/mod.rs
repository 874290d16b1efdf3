//! Persistent key/value tier.
//!
//! Durable storage surviving process restarts, with per-entry timestamp and
//! size bookkeeping and capacity awareness. Reads never fail: a corrupted
//! entry is deleted on sight and reported as absent.

mod file;
mod memory;
mod types;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use types::{StorageUsage, StoreError, StoredEntry, StoredEntryMeta};

use futures::future::BoxFuture;

/// Durable key/value storage used as the cache's second tier.
///
/// Implementations must treat unreadable entries as absent (repairing as they
/// go) and must report quota exhaustion distinctly so the coordinator can
/// evict and retry the write once.
pub trait PersistentStore: Send + Sync {
    /// Read an entry. Never fails; corrupt entries are removed and reported
    /// as `None`.
    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<StoredEntry>>;

    /// Write an entry. `StoreError::QuotaExceeded` signals the caller to
    /// evict before retrying once.
    fn write<'a>(&'a self, key: &'a str, entry: StoredEntry) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Remove a single entry. Removing an absent key is not an error.
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()>;

    /// Remove every entry whose key belongs to the given restaurant scope.
    fn remove_scope<'a>(&'a self, restaurant_id: &'a str) -> BoxFuture<'a, ()>;

    /// List metadata for every stored entry (used by eviction planning).
    fn scan(&self) -> BoxFuture<'_, Vec<StoredEntryMeta>>;

    /// Best-effort usage report. Implementations that cannot determine a
    /// quota return `quota_bytes: None` rather than zero.
    fn estimate_usage(&self) -> BoxFuture<'_, StorageUsage>;
}
