//! Per-data-kind cache policy.
//!
//! Each kind of cached payload (categories, item details, restaurant
//! metadata) carries its own eviction priority, time-to-live, and
//! background-refresh eligibility. Strategies are configuration, not runtime
//! state: the registry is built once at startup and is immutable afterwards.

use std::time::Duration;

/// The kind of payload a cache entry holds.
///
/// Selects the [`CacheStrategy`] applied to the entry, independent of which
/// restaurant it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Restaurant metadata (name, logo, accepting-orders flag).
    RestaurantMetadata,
    /// Menu categories with nested item summaries.
    Categories,
    /// Full detail record for a single menu item.
    MenuItemDetails,
}

impl DataKind {
    /// Stable string form used in persisted keys and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RestaurantMetadata => "restaurant-metadata",
            Self::Categories => "categories",
            Self::MenuItemDetails => "menu-item-details",
        }
    }

    /// Parse the stable string form back into a kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "restaurant-metadata" => Some(Self::RestaurantMetadata),
            "categories" => Some(Self::Categories),
            "menu-item-details" => Some(Self::MenuItemDetails),
            _ => None,
        }
    }

    /// All kinds, in preload order.
    pub fn all() -> [DataKind; 3] {
        [
            Self::RestaurantMetadata,
            Self::Categories,
            Self::MenuItemDetails,
        ]
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy applied to one data kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStrategy {
    /// Relative importance under memory pressure; higher priority is
    /// evicted last.
    pub priority: u8,
    /// Entries older than this are stale and treated as a miss on read,
    /// except for the stale-while-revalidate and offline-fallback paths.
    pub ttl: Duration,
    /// Whether a stale read may return the old value immediately while a
    /// non-blocking refetch updates the cache in the background.
    pub background_refresh: bool,
}

impl CacheStrategy {
    /// Whether an entry written at `stored_at_ms` is expired at `now_ms`.
    pub fn is_expired(&self, stored_at_ms: u64, now_ms: u64) -> bool {
        now_ms.saturating_sub(stored_at_ms) > self.ttl.as_millis() as u64
    }
}

/// Immutable table of strategies, one per [`DataKind`].
///
/// The defaults reflect kiosk usage: the active menu (categories) is the
/// highest-priority payload and must survive eviction; item details are
/// numerous and individually cheap to refetch.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    restaurant_metadata: CacheStrategy,
    categories: CacheStrategy,
    menu_item_details: CacheStrategy,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self {
            restaurant_metadata: CacheStrategy {
                priority: 6,
                ttl: Duration::from_secs(10 * 60),
                background_refresh: true,
            },
            categories: CacheStrategy {
                priority: 8,
                ttl: Duration::from_secs(5 * 60),
                background_refresh: true,
            },
            menu_item_details: CacheStrategy {
                priority: 3,
                ttl: Duration::from_secs(15 * 60),
                background_refresh: false,
            },
        }
    }
}

impl StrategyRegistry {
    /// Look up the strategy for a kind.
    pub fn for_kind(&self, kind: DataKind) -> CacheStrategy {
        match kind {
            DataKind::RestaurantMetadata => self.restaurant_metadata,
            DataKind::Categories => self.categories,
            DataKind::MenuItemDetails => self.menu_item_details,
        }
    }

    /// Override the strategy for one kind (startup configuration only).
    pub fn with_strategy(mut self, kind: DataKind, strategy: CacheStrategy) -> Self {
        match kind {
            DataKind::RestaurantMetadata => self.restaurant_metadata = strategy,
            DataKind::Categories => self.categories = strategy,
            DataKind::MenuItemDetails => self.menu_item_details = strategy,
        }
        self
    }

    /// The full table as (kind, strategy) pairs, for diagnostics.
    pub fn table(&self) -> Vec<(DataKind, CacheStrategy)> {
        DataKind::all()
            .into_iter()
            .map(|kind| (kind, self.for_kind(kind)))
            .collect()
    }
}
