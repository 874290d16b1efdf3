//! In-process persistent store stand-in.
//!
//! Keeps serialized envelopes in a `HashMap`. Not durable across processes;
//! exists for tests and the CLI demo, where a real kiosk would plug in
//! platform storage. Stores raw bytes rather than parsed entries so it
//! faithfully reproduces the repair-on-read behavior of real storage,
//! including corruption injection in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use super::types::{StorageUsage, StoreError, StoredEntry, StoredEntryMeta};
use super::PersistentStore;

/// Map-backed store with optional quota enforcement.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    /// Create a store with no quota (usage reports quota as unknown).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Overwrite a key with unparseable bytes. Test hook for the
    /// corrupted-entry repair path.
    pub fn inject_corrupt(&self, key: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), b"{corrupt".to_vec());
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn used(&self) -> u64 {
        self.entries
            .lock()
            .unwrap()
            .values()
            .map(|v| v.len() as u64)
            .sum()
    }
}

impl PersistentStore for MemoryStore {
    fn read<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<StoredEntry>> {
        async move {
            let bytes = self.entries.lock().unwrap().get(key).cloned()?;
            match serde_json::from_slice::<StoredEntry>(&bytes) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!(key, error = %err, "Removing corrupt cache entry");
                    self.entries.lock().unwrap().remove(key);
                    None
                }
            }
        }
        .boxed()
    }

    fn write<'a>(
        &'a self,
        key: &'a str,
        entry: StoredEntry,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            let bytes = serde_json::to_vec(&entry)?;

            if let Some(quota) = self.quota_bytes {
                let old = self
                    .entries
                    .lock()
                    .unwrap()
                    .get(key)
                    .map(|v| v.len() as u64)
                    .unwrap_or(0);
                let projected = self.used() - old + bytes.len() as u64;
                if projected > quota {
                    return Err(StoreError::QuotaExceeded {
                        used_bytes: self.used(),
                        quota_bytes: quota,
                    });
                }
            }

            self.entries.lock().unwrap().insert(key.to_string(), bytes);
            Ok(())
        }
        .boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()> {
        async move {
            self.entries.lock().unwrap().remove(key);
        }
        .boxed()
    }

    fn remove_scope<'a>(&'a self, restaurant_id: &'a str) -> BoxFuture<'a, ()> {
        async move {
            self.entries
                .lock()
                .unwrap()
                .retain(|key, _| key.split('_').nth(1) != Some(restaurant_id));
        }
        .boxed()
    }

    fn scan(&self) -> BoxFuture<'_, Vec<StoredEntryMeta>> {
        async move {
            let snapshot: Vec<(String, Vec<u8>)> = self
                .entries
                .lock()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            let mut metas = Vec::new();
            for (key, bytes) in snapshot {
                match serde_json::from_slice::<StoredEntry>(&bytes) {
                    Ok(entry) => metas.push(StoredEntryMeta {
                        key,
                        stored_at_ms: entry.stored_at_ms,
                        size_bytes: bytes.len() as u64,
                    }),
                    Err(_) => {
                        self.entries.lock().unwrap().remove(&key);
                    }
                }
            }
            metas
        }
        .boxed()
    }

    fn estimate_usage(&self) -> BoxFuture<'_, StorageUsage> {
        async move {
            StorageUsage {
                used_bytes: self.used(),
                quota_bytes: self.quota_bytes,
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: serde_json::Value) -> StoredEntry {
        StoredEntry::new(value, 500)
    }

    #[tokio::test]
    async fn write_read_round_trip() {
        let store = MemoryStore::new();
        let stored = entry(serde_json::json!({"name": "Mains"}));

        store.write("mc_r1_categories", stored.clone()).await.unwrap();
        assert_eq!(store.read("mc_r1_categories").await, Some(stored));
    }

    #[tokio::test]
    async fn corrupt_entry_self_heals() {
        let store = MemoryStore::new();
        store
            .write("mc_r1_categories", entry(serde_json::json!(1)))
            .await
            .unwrap();
        store.inject_corrupt("mc_r1_categories");

        assert_eq!(store.read("mc_r1_categories").await, None);
        assert!(store.is_empty(), "corrupt key should be deleted");
    }

    #[tokio::test]
    async fn quota_rejects_oversized_write() {
        let store = MemoryStore::with_quota(32);
        let result = store
            .write("mc_r1_categories", entry(serde_json::json!("y".repeat(100))))
            .await;
        assert!(matches!(result, Err(StoreError::QuotaExceeded { .. })));
    }

    #[tokio::test]
    async fn remove_scope_is_tenant_scoped() {
        let store = MemoryStore::new();
        store
            .write("mc_r1_categories", entry(serde_json::json!(1)))
            .await
            .unwrap();
        store
            .write("mc_r2_categories", entry(serde_json::json!(2)))
            .await
            .unwrap();

        store.remove_scope("r1").await;
        assert_eq!(store.len(), 1);
        assert!(store.read("mc_r2_categories").await.is_some());
    }

    #[tokio::test]
    async fn scan_skips_and_repairs_corrupt_entries() {
        let store = MemoryStore::new();
        store
            .write("mc_r1_categories", entry(serde_json::json!(1)))
            .await
            .unwrap();
        store.inject_corrupt("mc_r1_menu-item-details_i1");

        let metas = store.scan().await;
        assert_eq!(metas.len(), 1);
        assert_eq!(store.len(), 1);
    }
}
