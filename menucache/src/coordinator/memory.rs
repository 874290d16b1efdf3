//! In-memory cache tier.
//!
//! Fastest tier, process-lifetime only, never suspends. Size accounting uses
//! the serialized-length estimate carried by each entry so the coordinator
//! can react to memory pressure without reserializing.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::key::CacheKey;
use crate::strategy::DataKind;

/// One entry in the memory tier. Value and timestamp are written together;
/// readers never see one without the other.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub value: serde_json::Value,
    pub stored_at_ms: u64,
    pub size_bytes: u64,
}

/// Concurrent map of cache entries with running size accounting.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: DashMap<CacheKey, MemoryEntry>,
    used_bytes: AtomicU64,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<MemoryEntry> {
        self.entries.get(key).map(|e| e.clone())
    }

    pub fn insert(&self, key: CacheKey, entry: MemoryEntry) {
        let new_size = entry.size_bytes;
        let old_size = self
            .entries
            .insert(key, entry)
            .map(|old| old.size_bytes)
            .unwrap_or(0);
        self.used_bytes.fetch_add(new_size, Ordering::Relaxed);
        self.used_bytes
            .fetch_sub(old_size.min(self.used_bytes()), Ordering::Relaxed);
    }

    pub fn remove(&self, key: &CacheKey) {
        if let Some((_, entry)) = self.entries.remove(key) {
            self.used_bytes
                .fetch_sub(entry.size_bytes.min(self.used_bytes()), Ordering::Relaxed);
        }
    }

    /// Remove every entry for one restaurant, across scopes and kinds.
    pub fn remove_scope(&self, restaurant_id: &str) {
        self.retain(|key| key.restaurant_id != restaurant_id);
    }

    /// Remove every entry of one kind for one restaurant, across scopes.
    pub fn remove_kind(&self, kind: DataKind, restaurant_id: &str) {
        self.retain(|key| !(key.kind == kind && key.restaurant_id == restaurant_id));
    }

    fn retain(&self, keep: impl Fn(&CacheKey) -> bool) {
        let mut freed = 0;
        self.entries.retain(|key, entry| {
            if keep(key) {
                true
            } else {
                freed += entry.size_bytes;
                false
            }
        });
        self.used_bytes
            .fetch_sub(freed.min(self.used_bytes()), Ordering::Relaxed);
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot of (key, stored_at, size) for eviction planning.
    pub fn candidates(&self) -> Vec<(CacheKey, u64, u64)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.stored_at_ms, e.size_bytes))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::key::Scope;

    fn key(restaurant: &str, kind: DataKind) -> CacheKey {
        CacheKey::new(kind, restaurant, None, Scope::Customer)
    }

    fn entry(size: u64) -> MemoryEntry {
        MemoryEntry {
            value: serde_json::json!(null),
            stored_at_ms: 0,
            size_bytes: size,
        }
    }

    #[test]
    fn insert_and_get() {
        let tier = MemoryTier::new();
        let k = key("r1", DataKind::Categories);
        tier.insert(k.clone(), entry(100));

        assert!(tier.get(&k).is_some());
        assert_eq!(tier.used_bytes(), 100);
        assert_eq!(tier.entry_count(), 1);
    }

    #[test]
    fn overwrite_replaces_size() {
        let tier = MemoryTier::new();
        let k = key("r1", DataKind::Categories);
        tier.insert(k.clone(), entry(100));
        tier.insert(k, entry(40));

        assert_eq!(tier.used_bytes(), 40);
        assert_eq!(tier.entry_count(), 1);
    }

    #[test]
    fn remove_releases_size() {
        let tier = MemoryTier::new();
        let k = key("r1", DataKind::Categories);
        tier.insert(k.clone(), entry(100));
        tier.remove(&k);

        assert_eq!(tier.used_bytes(), 0);
        assert!(tier.get(&k).is_none());
    }

    #[test]
    fn remove_scope_spares_other_tenants() {
        let tier = MemoryTier::new();
        tier.insert(key("r1", DataKind::Categories), entry(10));
        tier.insert(key("r1", DataKind::RestaurantMetadata), entry(10));
        tier.insert(key("r2", DataKind::Categories), entry(10));

        tier.remove_scope("r1");
        assert_eq!(tier.entry_count(), 1);
        assert_eq!(tier.used_bytes(), 10);
    }

    #[test]
    fn remove_kind_is_kind_and_tenant_scoped() {
        let tier = MemoryTier::new();
        tier.insert(key("r1", DataKind::Categories), entry(10));
        tier.insert(key("r1", DataKind::RestaurantMetadata), entry(10));
        tier.insert(key("r2", DataKind::Categories), entry(10));

        tier.remove_kind(DataKind::Categories, "r1");
        assert_eq!(tier.entry_count(), 2);
        assert!(tier.get(&key("r1", DataKind::RestaurantMetadata)).is_some());
        assert!(tier.get(&key("r2", DataKind::Categories)).is_some());
    }

    #[test]
    fn candidates_report_all_entries() {
        let tier = MemoryTier::new();
        tier.insert(key("r1", DataKind::Categories), entry(10));
        tier.insert(key("r2", DataKind::Categories), entry(20));

        let mut sizes: Vec<u64> = tier.candidates().iter().map(|(_, _, s)| *s).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![10, 20]);
    }
}
