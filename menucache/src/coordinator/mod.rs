//! Two-tier cache coordination.
//!
//! The [`CacheCoordinator`] owns the read and write paths across the memory
//! and persistent tiers: promote-on-persistent-hit, TTL expiry with
//! stale-while-revalidate and offline fallback, priority-weighted eviction
//! under memory pressure, invalidation (local and cross-context), and the
//! diagnostics surface.

mod diagnostics;
mod eviction;
mod key;
mod maintenance;
mod memory;

pub use diagnostics::{DiagnosticsSnapshot, StrategyInfo};
pub use eviction::{plan_eviction, EvictionCandidate, EvictionPlan, Tier};
pub use key::{CacheKey, Scope};
pub use maintenance::MaintenanceDaemon;
pub use memory::{MemoryEntry, MemoryTier};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::connection::ConnectionStatus;
use crate::metrics::{CacheMetrics, MetricsSnapshot};
use crate::source::{DataSource, FetchError};
use crate::store::{PersistentStore, StoreError, StoredEntry};
use crate::strategy::{CacheStrategy, DataKind, StrategyRegistry};
use crate::time::{Clock, SystemClock};

/// Errors surfaced by coordinator operations.
///
/// A plain miss is not an error; these are caller mistakes and tier
/// failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The key carries no restaurant id. Tenant scoping is mandatory, so
    /// this fails loudly instead of reading another tenant's data.
    #[error("cache key has no restaurant id")]
    MissingRestaurantId,

    /// A per-entity kind was used without an entity id.
    #[error("cache key has no entity id for a per-entity kind")]
    MissingEntityId,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("cannot serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Invalidation message, suitable for fanning out to other cache contexts
/// (other kiosk windows, the admin dashboard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationEvent {
    pub kind: DataKind,
    pub restaurant_id: String,
}

type InvalidationObserver = Box<dyn Fn(&InvalidationEvent) + Send + Sync>;

/// Tunables for the coordinator. Defaults fit a single-restaurant kiosk.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Prefix for every persisted key; isolates this cache's entries from
    /// anything else sharing the store.
    pub namespace: String,
    /// Soft ceiling for the memory tier.
    pub memory_budget_bytes: u64,
    /// Optimization triggers when usage crosses this percentage of budget,
    /// and evicts back down to it.
    pub optimize_threshold_percent: u8,
    /// Number of highest-ranked entries eviction never touches.
    pub protected_floor: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            namespace: "menucache".to_string(),
            memory_budget_bytes: 64 * 1024 * 1024,
            optimize_threshold_percent: 80,
            protected_floor: 8,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_memory_budget_bytes(mut self, bytes: u64) -> Self {
        self.memory_budget_bytes = bytes;
        self
    }

    pub fn with_optimize_threshold_percent(mut self, percent: u8) -> Self {
        self.optimize_threshold_percent = percent.min(100);
        self
    }

    pub fn with_protected_floor(mut self, floor: usize) -> Self {
        self.protected_floor = floor;
        self
    }
}

/// Coordinates reads and writes across the memory and persistent tiers.
///
/// Collaborators and tiers sit behind `Arc` so background refresh tasks can
/// carry their own handles without holding the coordinator itself.
pub struct CacheCoordinator {
    config: CoordinatorConfig,
    memory: Arc<MemoryTier>,
    store: Arc<dyn PersistentStore>,
    source: Arc<dyn DataSource>,
    strategies: StrategyRegistry,
    metrics: Arc<CacheMetrics>,
    status: Arc<ConnectionStatus>,
    clock: Arc<dyn Clock>,
    /// Storage keys with a background refresh currently in flight.
    refreshing: Arc<DashMap<String, ()>>,
    invalidation_observers: Mutex<Vec<InvalidationObserver>>,
}

impl CacheCoordinator {
    /// Create a coordinator with default configuration over the given tiers.
    pub fn new(store: Arc<dyn PersistentStore>, source: Arc<dyn DataSource>) -> Self {
        Self {
            config: CoordinatorConfig::default(),
            memory: Arc::new(MemoryTier::new()),
            store,
            source,
            strategies: StrategyRegistry::default(),
            metrics: Arc::new(CacheMetrics::new()),
            status: Arc::new(ConnectionStatus::default()),
            clock: Arc::new(SystemClock),
            refreshing: Arc::new(DashMap::new()),
            invalidation_observers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_status(mut self, status: Arc<ConnectionStatus>) -> Self {
        self.status = status;
        self
    }

    /// Shared online/offline status handle.
    pub fn status(&self) -> Arc<ConnectionStatus> {
        Arc::clone(&self.status)
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Current metrics with derived rates.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Background refreshes currently in flight.
    pub fn pending_refreshes(&self) -> usize {
        self.refreshing.len()
    }

    /// Active configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Whether either tier is past the optimization threshold.
    pub async fn over_pressure(&self) -> bool {
        let percent = self.config.optimize_threshold_percent as u64;
        if self.memory.used_bytes() > self.config.memory_budget_bytes * percent / 100 {
            return true;
        }
        let usage = self.store.estimate_usage().await;
        matches!(usage.used_fraction(), Some(fraction) if fraction * 100.0 > percent as f64)
    }

    fn validate(&self, key: &CacheKey) -> Result<(), CacheError> {
        if key.restaurant_id.is_empty() {
            return Err(CacheError::MissingRestaurantId);
        }
        if key.kind == DataKind::MenuItemDetails && key.entity_id.is_none() {
            return Err(CacheError::MissingEntityId);
        }
        Ok(())
    }

    /// Look up a value.
    ///
    /// Fresh entries are served from memory first, then from the persistent
    /// tier (promoting into memory). A stale entry is still served when the
    /// device is offline, or when the kind is refresh-eligible and a
    /// non-blocking background refetch can run; otherwise staleness is a
    /// miss. Repeating a `get` never mutates cached state beyond promotion
    /// and counters.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<serde_json::Value>, CacheError> {
        self.validate(key)?;
        self.metrics.record_request();

        let strategy = self.strategies.for_kind(key.kind);
        let now = self.clock.now_ms();

        if let Some(entry) = self.memory.get(key) {
            if !strategy.is_expired(entry.stored_at_ms, now) {
                self.metrics.record_hit();
                return Ok(Some(entry.value));
            }
            return Ok(self.serve_stale(key, strategy, entry.value));
        }

        let storage_key = key.storage_key(&self.config.namespace);
        if let Some(stored) = self.store.read(&storage_key).await {
            let size = stored.size_estimate();
            let fresh = !strategy.is_expired(stored.stored_at_ms, now);
            // Promote regardless of freshness so the offline fallback stays
            // warm across reads.
            self.memory.insert(
                key.clone(),
                MemoryEntry {
                    value: stored.value.clone(),
                    stored_at_ms: stored.stored_at_ms,
                    size_bytes: size,
                },
            );
            if fresh {
                debug!(key = %storage_key, "Promoted persistent entry to memory");
                self.metrics.record_hit();
                return Ok(Some(stored.value));
            }
            return Ok(self.serve_stale(key, strategy, stored.value));
        }

        Ok(None)
    }

    /// Decide what to do with an expired entry; `Some` counts as a hit.
    fn serve_stale(
        &self,
        key: &CacheKey,
        strategy: CacheStrategy,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        if !self.status.is_online() {
            debug!(kind = %key.kind, "Offline, serving stale entry");
            self.metrics.record_hit();
            return Some(value);
        }
        if strategy.background_refresh {
            self.spawn_refresh(key.clone());
            self.metrics.record_hit();
            return Some(value);
        }
        None
    }

    /// Store a value in both tiers, stamped at the current time.
    ///
    /// On quota exhaustion the coordinator runs one optimization pass and
    /// retries the persistent write once. A persistent write that still
    /// fails is logged and swallowed: the memory tier holds the value, so
    /// only durability across restarts degrades.
    pub async fn set(&self, key: &CacheKey, value: serde_json::Value) -> Result<(), CacheError> {
        self.validate(key)?;
        self.write_entry(key, value).await?;

        let threshold =
            self.config.memory_budget_bytes * self.config.optimize_threshold_percent as u64 / 100;
        if self.memory.used_bytes() > threshold {
            self.optimize().await;
        }
        Ok(())
    }

    async fn write_entry(&self, key: &CacheKey, value: serde_json::Value) -> Result<(), CacheError> {
        let now = self.clock.now_ms();
        let stored = StoredEntry::new(value.clone(), now);
        let size = stored.size_estimate();

        self.memory.insert(
            key.clone(),
            MemoryEntry {
                value,
                stored_at_ms: now,
                size_bytes: size,
            },
        );

        // The memory tier already holds the value; persistent-tier failures
        // degrade durability, not the current session.
        let storage_key = key.storage_key(&self.config.namespace);
        match self.store.write(&storage_key, stored.clone()).await {
            Ok(()) => {}
            Err(StoreError::QuotaExceeded { used_bytes, quota_bytes }) => {
                info!(
                    key = %storage_key,
                    used_bytes,
                    quota_bytes,
                    "Store quota exceeded, optimizing and retrying"
                );
                self.optimize().await;
                if let Err(error) = self.store.write(&storage_key, stored).await {
                    warn!(key = %storage_key, %error, "Persistent write failed after eviction");
                }
            }
            Err(error) => {
                warn!(key = %storage_key, %error, "Persistent write failed");
            }
        }
        Ok(())
    }

    /// Refetch a key from the data source and overwrite both tiers.
    pub async fn refresh_now(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.validate(key)?;
        let value = fetch_value(self.source.as_ref(), key).await?;
        self.write_entry(key, value).await
    }

    /// Start a deduplicated background refresh for a key. A refresh already
    /// in flight for the same storage key absorbs the request.
    ///
    /// The spawned task writes straight into both tiers. It skips the quota
    /// retry path: a refresh replaces an entry that already fits, and a
    /// failed persistent write still leaves the fresh value in memory.
    pub fn spawn_refresh(&self, key: CacheKey) {
        let storage_key = key.storage_key(&self.config.namespace);
        if self.refreshing.insert(storage_key.clone(), ()).is_some() {
            return;
        }

        let source = Arc::clone(&self.source);
        let memory = Arc::clone(&self.memory);
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let refreshing = Arc::clone(&self.refreshing);
        tokio::spawn(async move {
            debug!(key = %storage_key, "Background refresh started");
            match fetch_value(source.as_ref(), &key).await {
                Ok(value) => {
                    let now = clock.now_ms();
                    let stored = StoredEntry::new(value.clone(), now);
                    let size = stored.size_estimate();
                    memory.insert(
                        key,
                        MemoryEntry {
                            value,
                            stored_at_ms: now,
                            size_bytes: size,
                        },
                    );
                    if let Err(error) = store.write(&storage_key, stored).await {
                        warn!(key = %storage_key, %error, "Persistent write failed during refresh");
                    }
                }
                Err(error) => warn!(key = %storage_key, %error, "Background refresh failed"),
            }
            refreshing.remove(&storage_key);
        });
    }

    /// Remove one exact entry from both tiers.
    pub async fn invalidate_entry(&self, key: &CacheKey) {
        self.memory.remove(key);
        self.store.remove(&key.storage_key(&self.config.namespace)).await;
    }

    /// Remove every entry of one kind for one restaurant, across scopes and
    /// tiers, and notify invalidation observers.
    pub async fn invalidate(&self, kind: DataKind, restaurant_id: &str) {
        self.remove_kind_everywhere(kind, restaurant_id).await;
        self.notify_invalidation(&InvalidationEvent {
            kind,
            restaurant_id: restaurant_id.to_string(),
        });
    }

    /// Remove everything cached for one restaurant, across kinds, scopes and
    /// tiers, notifying observers per kind.
    pub async fn invalidate_scope(&self, restaurant_id: &str) {
        self.memory.remove_scope(restaurant_id);
        self.store.remove_scope(restaurant_id).await;
        for kind in DataKind::all() {
            self.notify_invalidation(&InvalidationEvent {
                kind,
                restaurant_id: restaurant_id.to_string(),
            });
        }
    }

    /// Register a callback for local invalidations, typically bridged to a
    /// cross-context channel by the embedding application.
    pub fn on_invalidation(&self, observer: impl Fn(&InvalidationEvent) + Send + Sync + 'static) {
        self.invalidation_observers
            .lock()
            .unwrap()
            .push(Box::new(observer));
    }

    /// Apply an invalidation received from another context. Removes the
    /// affected entries without re-notifying observers, so messages never
    /// echo between contexts.
    pub async fn apply_external_invalidation(&self, event: &InvalidationEvent) {
        debug!(kind = %event.kind, restaurant = %event.restaurant_id, "Applying external invalidation");
        self.remove_kind_everywhere(event.kind, &event.restaurant_id).await;
    }

    async fn remove_kind_everywhere(&self, kind: DataKind, restaurant_id: &str) {
        self.memory.remove_kind(kind, restaurant_id);
        for meta in self.store.scan().await {
            if let Some(key) = CacheKey::parse(&self.config.namespace, &meta.key) {
                if key.kind == kind && key.restaurant_id == restaurant_id {
                    self.store.remove(&meta.key).await;
                }
            }
        }
    }

    fn notify_invalidation(&self, event: &InvalidationEvent) {
        let observers = self.invalidation_observers.lock().unwrap();
        for observer in observers.iter() {
            if catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
                warn!("Invalidation observer panicked");
            }
        }
    }

    /// Run one eviction pass, bringing usage back under the optimization
    /// threshold. Persistent entries participate only when the store can
    /// report a quota.
    pub async fn optimize(&self) {
        let usage = self.store.estimate_usage().await;
        let namespace = &self.config.namespace;

        let mut candidates: Vec<EvictionCandidate> = self
            .memory
            .candidates()
            .into_iter()
            .map(|(key, stored_at_ms, size_bytes)| EvictionCandidate {
                priority: self.strategies.for_kind(key.kind).priority,
                storage_key: key.storage_key(namespace),
                tier: Tier::Memory,
                stored_at_ms,
                size_bytes,
            })
            .collect();

        let mut used = self.memory.used_bytes();
        let mut budget = self.config.memory_budget_bytes;

        if let Some(quota) = usage.quota_bytes {
            used += usage.used_bytes;
            budget += quota;
            for meta in self.store.scan().await {
                if let Some(key) = CacheKey::parse(namespace, &meta.key) {
                    candidates.push(EvictionCandidate {
                        priority: self.strategies.for_kind(key.kind).priority,
                        storage_key: meta.key,
                        tier: Tier::Persistent,
                        stored_at_ms: meta.stored_at_ms,
                        size_bytes: meta.size_bytes,
                    });
                }
            }
        }

        let target = budget * self.config.optimize_threshold_percent as u64 / 100;
        let plan = plan_eviction(candidates, used, target, self.config.protected_floor);

        for victim in &plan.victims {
            match victim.tier {
                Tier::Memory => {
                    if let Some(key) = CacheKey::parse(namespace, &victim.storage_key) {
                        self.memory.remove(&key);
                    }
                }
                Tier::Persistent => self.store.remove(&victim.storage_key).await,
            }
        }

        if !plan.victims.is_empty() {
            info!(
                evicted = plan.victims.len(),
                bytes_freed = plan.bytes_freed,
                "Memory optimization pass complete"
            );
        }
        self.metrics.record_cleanup(self.clock.now_ms());
    }

    /// Compose the full diagnostics view. Read-only.
    pub async fn diagnostics(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            metrics: self.metrics.snapshot(),
            storage: self.store.estimate_usage().await,
            memory_used_bytes: self.memory.used_bytes(),
            memory_entry_count: self.memory.entry_count(),
            strategies: self
                .strategies
                .table()
                .into_iter()
                .map(|(kind, strategy)| StrategyInfo::new(kind, strategy))
                .collect(),
            online: self.status.is_online(),
            pending_refreshes: self.refreshing.len(),
        }
    }
}

/// Fetch the payload a key describes from the data source.
async fn fetch_value(
    source: &dyn DataSource,
    key: &CacheKey,
) -> Result<serde_json::Value, CacheError> {
    let value = match key.kind {
        DataKind::RestaurantMetadata => {
            serde_json::to_value(source.fetch_restaurant_metadata(&key.restaurant_id).await?)?
        }
        DataKind::Categories => {
            serde_json::to_value(source.fetch_categories(&key.restaurant_id).await?)?
        }
        DataKind::MenuItemDetails => {
            let item_id = key.entity_id.as_deref().ok_or(CacheError::MissingEntityId)?;
            serde_json::to_value(source.fetch_menu_item_details(item_id).await?)?
        }
    };
    Ok(value)
}

impl std::fmt::Debug for CacheCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCoordinator")
            .field("config", &self.config)
            .field("memory_entries", &self.memory.entry_count())
            .finish_non_exhaustive()
    }
}
