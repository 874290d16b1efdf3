//! Shared wiring for CLI commands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use menucache::connection::{ConnectionHint, ConnectivityProbe};
use menucache::coordinator::CacheCoordinator;
use menucache::model::{Category, MenuItemDetails, Restaurant};
use menucache::source::{DataSource, FetchError, Fixture, FixtureSource};
use menucache::store::{FileStore, PersistentStore};

use crate::error::CliError;

/// Probe with a fixed answer, driven by CLI flags instead of a real network.
pub struct StaticProbe {
    rtt: Option<Duration>,
    hint: Option<ConnectionHint>,
}

impl StaticProbe {
    pub fn new(rtt_ms: Option<u64>, hint: Option<ConnectionHint>) -> Self {
        Self {
            rtt: rtt_ms.map(Duration::from_millis),
            hint,
        }
    }
}

impl ConnectivityProbe for StaticProbe {
    fn measure_rtt(&self) -> BoxFuture<'_, Option<Duration>> {
        let rtt = self.rtt;
        async move { rtt }.boxed()
    }

    fn hint(&self) -> Option<ConnectionHint> {
        self.hint
    }
}

/// Data source for commands that only inspect the cache; every fetch fails.
pub struct NoSource;

impl DataSource for NoSource {
    fn fetch_restaurant_metadata<'a>(
        &'a self,
        _restaurant_id: &'a str,
    ) -> BoxFuture<'a, Result<Restaurant, FetchError>> {
        async { Err(FetchError::new("no data source configured")) }.boxed()
    }

    fn fetch_categories<'a>(
        &'a self,
        _restaurant_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Category>, FetchError>> {
        async { Err(FetchError::new("no data source configured")) }.boxed()
    }

    fn fetch_menu_item_details<'a>(
        &'a self,
        _item_id: &'a str,
    ) -> BoxFuture<'a, Result<MenuItemDetails, FetchError>> {
        async { Err(FetchError::new("no data source configured")) }.boxed()
    }
}

/// Open the file store at the given cache directory.
pub async fn open_store(
    cache_dir: &Path,
    quota_mb: Option<u64>,
) -> Result<Arc<FileStore>, CliError> {
    FileStore::open(cache_dir, quota_mb.map(|mb| mb * 1024 * 1024))
        .await
        .map(Arc::new)
        .map_err(|e| CliError::Store(e.to_string()))
}

/// Load a fixture and build a coordinator over it.
pub async fn coordinator_with_fixture(
    cache_dir: &Path,
    quota_mb: Option<u64>,
    fixture_path: &Path,
    latency_ms: Option<u64>,
) -> Result<(Arc<CacheCoordinator>, Arc<FixtureSource>), CliError> {
    let fixture = Fixture::load(fixture_path)
        .await
        .map_err(|e| CliError::Fixture(e.to_string()))?;

    let mut source = FixtureSource::new(fixture);
    if let Some(latency) = latency_ms {
        source = source.with_latency(Duration::from_millis(latency));
    }
    let source = Arc::new(source);

    let store = open_store(cache_dir, quota_mb).await?;
    let coordinator = Arc::new(CacheCoordinator::new(
        store as Arc<dyn PersistentStore>,
        Arc::clone(&source) as Arc<dyn DataSource>,
    ));
    Ok((coordinator, source))
}

/// Coordinator over the cache directory with no usable data source.
pub async fn coordinator_readonly(
    cache_dir: &Path,
    quota_mb: Option<u64>,
) -> Result<Arc<CacheCoordinator>, CliError> {
    let store = open_store(cache_dir, quota_mb).await?;
    Ok(Arc::new(CacheCoordinator::new(
        store as Arc<dyn PersistentStore>,
        Arc::new(NoSource) as Arc<dyn DataSource>,
    )))
}
