//! Periodic cache maintenance daemon.
//!
//! Kiosks run for days between restarts, so memory pressure is not only
//! write-driven: the daemon checks both tiers on an interval and runs an
//! optimization pass when either is past the threshold. Respects
//! cancellation for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::CacheCoordinator;

/// Default interval between pressure checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that keeps cache usage under the configured threshold.
pub struct MaintenanceDaemon {
    coordinator: Arc<CacheCoordinator>,
    check_interval: Duration,
}

impl MaintenanceDaemon {
    pub fn new(coordinator: Arc<CacheCoordinator>) -> Self {
        Self {
            coordinator,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Override the check interval.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Run until shutdown is signalled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            check_interval_secs = self.check_interval.as_secs(),
            "Cache maintenance daemon starting"
        );

        let mut interval = tokio::time::interval(self.check_interval);
        // Skip the first immediate tick
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Cache maintenance daemon shutting down");
                    break;
                }

                _ = interval.tick() => {
                    if self.coordinator.over_pressure().await {
                        self.coordinator.optimize().await;
                    } else {
                        debug!("Cache below threshold, skipping optimization");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{CacheKey, CoordinatorConfig, Scope};
    use crate::source::{sample_fixture, DataSource, FixtureSource};
    use crate::store::{MemoryStore, PersistentStore};
    use crate::strategy::DataKind;

    fn coordinator(config: CoordinatorConfig) -> Arc<CacheCoordinator> {
        Arc::new(
            CacheCoordinator::new(
                Arc::new(MemoryStore::new()) as Arc<dyn PersistentStore>,
                Arc::new(FixtureSource::new(sample_fixture())) as Arc<dyn DataSource>,
            )
            .with_config(config),
        )
    }

    #[tokio::test]
    async fn respects_shutdown() {
        let daemon = MaintenanceDaemon::new(coordinator(CoordinatorConfig::default()))
            .with_check_interval(Duration::from_millis(100));

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();
        let handle = tokio::spawn(daemon.run(shutdown_clone));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn optimizes_when_over_threshold() {
        // Budget so small that any entry is over the threshold. Populate via
        // refresh_now, which has no pressure check of its own, so the daemon
        // is the only thing that can trigger the pass.
        let coordinator = coordinator(
            CoordinatorConfig::default()
                .with_memory_budget_bytes(1)
                .with_optimize_threshold_percent(50)
                .with_protected_floor(0),
        );
        let key = CacheKey::new(DataKind::Categories, "r1", None, Scope::Customer);
        coordinator.refresh_now(&key).await.unwrap();
        assert!(coordinator.over_pressure().await);

        let daemon = MaintenanceDaemon::new(Arc::clone(&coordinator))
            .with_check_interval(Duration::from_millis(10));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(daemon.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(60)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(coordinator.metrics().last_cleanup_ms.is_some());
        assert!(!coordinator.over_pressure().await);
    }
}
