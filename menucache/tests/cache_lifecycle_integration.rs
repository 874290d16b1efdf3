//! Integration tests for the full cache lifecycle.
//!
//! These tests wire the real pieces together: the file-backed persistent
//! store, the coordinator, the connection status, and the preloader. They
//! cover the canonical kiosk session: preload on boot, fresh reads inside
//! the TTL, stale-while-revalidate past it, offline fallback, and cache
//! survival across a process restart (a new coordinator over the same
//! directory).
//!
//! Run with: `cargo test --test cache_lifecycle_integration`

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tempfile::TempDir;

use menucache::connection::{ConnectivityProbe, QualityDetector};
use menucache::coordinator::{CacheCoordinator, CacheKey, Scope};
use menucache::model::{Category, MenuItem, MenuItemDetails, Restaurant};
use menucache::preload::{PreloadRequest, Preloader};
use menucache::source::{DataSource, Fixture, FixtureSource};
use menucache::store::{FileStore, PersistentStore};
use menucache::strategy::DataKind;
use menucache::time::{Clock, ManualClock};

fn fixture() -> Fixture {
    Fixture {
        restaurant: Restaurant {
            id: "r1".to_string(),
            name: "Blue Door Diner".to_string(),
            address: Some("12 Main St".to_string()),
            logo_url: None,
            accepting_orders: true,
        },
        categories: vec![Category {
            id: "c1".to_string(),
            name: "Mains".to_string(),
            sort_order: 0,
            items: vec![
                MenuItem {
                    id: "i1".to_string(),
                    name: "Burger".to_string(),
                    price_cents: 990,
                    image_url: None,
                    available: true,
                },
                MenuItem {
                    id: "i2".to_string(),
                    name: "Salad".to_string(),
                    price_cents: 750,
                    image_url: None,
                    available: true,
                },
            ],
        }],
        item_details: vec![
            MenuItemDetails {
                id: "i1".to_string(),
                name: "Burger".to_string(),
                price_cents: 990,
                description: Some("House patty".to_string()),
                image_url: None,
                options: vec![],
                allergens: vec!["gluten".to_string()],
            },
            MenuItemDetails {
                id: "i2".to_string(),
                name: "Salad".to_string(),
                price_cents: 750,
                description: None,
                image_url: None,
                options: vec![],
                allergens: vec![],
            },
        ],
    }
}

struct FastProbe;

impl ConnectivityProbe for FastProbe {
    fn measure_rtt(&self) -> BoxFuture<'_, Option<Duration>> {
        async { Some(Duration::from_millis(10)) }.boxed()
    }
}

struct Env {
    coordinator: Arc<CacheCoordinator>,
    source: Arc<FixtureSource>,
    clock: Arc<ManualClock>,
    dir: TempDir,
}

async fn env() -> Env {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::open(dir.path(), None).await.unwrap());
    let source = Arc::new(FixtureSource::new(fixture()));
    let clock = Arc::new(ManualClock::at(0));
    let coordinator = Arc::new(
        CacheCoordinator::new(
            store as Arc<dyn PersistentStore>,
            Arc::clone(&source) as Arc<dyn DataSource>,
        )
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>),
    );
    Env {
        coordinator,
        source,
        clock,
        dir,
    }
}

fn preloader(env: &Env) -> Arc<Preloader> {
    let detector = QualityDetector::new(env.coordinator.status(), Arc::new(FastProbe));
    Arc::new(
        Preloader::new(Arc::clone(&env.coordinator), detector)
            .with_retry_base(Duration::from_millis(1)),
    )
}

fn categories_key() -> CacheKey {
    CacheKey::new(DataKind::Categories, "r1", None, Scope::Customer)
}

async fn wait_for_refreshes(coordinator: &CacheCoordinator) {
    for _ in 0..200 {
        if coordinator.pending_refreshes() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("background refresh never finished");
}

#[tokio::test]
async fn boot_preload_then_reads_hit_without_refetching() {
    let env = env().await;
    preloader(&env).preload(PreloadRequest::new("r1")).await.unwrap();

    // Metadata + categories + two item detail records.
    assert_eq!(env.source.fetch_count(), 4);
    env.coordinator.reset_metrics();

    let categories = env.coordinator.get(&categories_key()).await.unwrap().unwrap();
    let parsed: Vec<Category> = serde_json::from_value(categories).unwrap();
    assert_eq!(parsed[0].items.len(), 2);

    // Served from cache, not the source.
    assert_eq!(env.source.fetch_count(), 4);
    assert_eq!(env.coordinator.metrics().cache_hits, 1);
}

#[tokio::test]
async fn stale_read_serves_old_value_then_swaps_in_the_refetch() {
    let env = env().await;
    let key = categories_key();
    env.coordinator
        .set(&key, serde_json::json!("yesterday's menu"))
        .await
        .unwrap();

    // Categories TTL is five minutes. Just inside it: fresh.
    env.clock.set(290_000);
    assert_eq!(
        env.coordinator.get(&key).await.unwrap(),
        Some(serde_json::json!("yesterday's menu"))
    );

    // Just past it: the stale value comes back immediately while the
    // refetch runs behind the read.
    env.clock.set(310_000);
    assert_eq!(
        env.coordinator.get(&key).await.unwrap(),
        Some(serde_json::json!("yesterday's menu"))
    );
    wait_for_refreshes(&env.coordinator).await;

    env.clock.set(320_000);
    let refreshed = env.coordinator.get(&key).await.unwrap().unwrap();
    let parsed: Vec<Category> = serde_json::from_value(refreshed).unwrap();
    assert_eq!(parsed[0].name, "Mains");
    assert_eq!(env.source.fetch_count(), 1);
}

#[tokio::test]
async fn cache_survives_restart_via_the_persistent_tier() {
    let env = env().await;
    preloader(&env).preload(PreloadRequest::new("r1")).await.unwrap();
    let fetched_during_boot = env.source.fetch_count();

    // A second coordinator over the same directory simulates a restart:
    // empty memory tier, warm persistent tier.
    let store = Arc::new(FileStore::open(env.dir.path(), None).await.unwrap());
    let restarted = Arc::new(
        CacheCoordinator::new(
            store as Arc<dyn PersistentStore>,
            Arc::clone(&env.source) as Arc<dyn DataSource>,
        )
        .with_clock(Arc::clone(&env.clock) as Arc<dyn Clock>),
    );

    let categories = restarted.get(&categories_key()).await.unwrap();
    assert!(categories.is_some());
    assert_eq!(env.source.fetch_count(), fetched_during_boot);
}

#[tokio::test]
async fn offline_kiosk_keeps_serving_the_expired_menu() {
    let env = env().await;
    preloader(&env).preload(PreloadRequest::new("r1")).await.unwrap();

    // Well past every TTL.
    env.clock.set(60 * 60 * 1000);
    env.coordinator.status().set_online(false);

    let details = CacheKey::new(DataKind::MenuItemDetails, "r1", Some("i1"), Scope::Customer);
    let value = env.coordinator.get(&details).await.unwrap().unwrap();
    let parsed: MenuItemDetails = serde_json::from_value(value).unwrap();
    assert_eq!(parsed.allergens, vec!["gluten".to_string()]);
}

#[tokio::test]
async fn second_boot_preload_skips_the_warm_cache() {
    let env = env().await;
    let preloader = preloader(&env);
    preloader.preload(PreloadRequest::new("r1")).await.unwrap();
    let first_boot = env.source.fetch_count();

    preloader.preload(PreloadRequest::new("r1")).await.unwrap();
    assert_eq!(env.source.fetch_count(), first_boot);
}

#[tokio::test]
async fn invalidation_forces_the_next_read_through_the_source() {
    let env = env().await;
    let preloader = preloader(&env);
    preloader.preload(PreloadRequest::new("r1")).await.unwrap();
    let after_boot = env.source.fetch_count();

    // Menu edited upstream: invalidate and read again.
    env.coordinator.invalidate(DataKind::Categories, "r1").await;
    assert_eq!(env.coordinator.get(&categories_key()).await.unwrap(), None);

    env.coordinator.refresh_now(&categories_key()).await.unwrap();
    assert_eq!(env.source.fetch_count(), after_boot + 1);
    assert!(env.coordinator.get(&categories_key()).await.unwrap().is_some());
}
