//! Adaptive startup preload.
//!
//! Warms the cache for one restaurant before the kiosk UI needs it:
//! restaurant metadata, the category tree, and (connection permitting) the
//! per-item detail records. Runs are single-flight: a preload requested
//! while one is already running joins the in-flight run and receives its
//! outcome instead of starting a duplicate. Transient fetch failures retry
//! with exponential backoff and jitter, re-checking the offline flag between
//! attempts.

mod plan;
mod state;

pub use plan::{AdaptedPlan, PreloadError, PreloadRequest};
pub use state::{PreloadStage, PreloaderState, StateCell, SubscriptionId};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use rand::Rng;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::connection::QualityDetector;
use crate::coordinator::{CacheCoordinator, CacheKey};
use crate::model::Category;
use crate::strategy::DataKind;

/// Default base delay for the retry backoff.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(500);

type SharedRun = Shared<BoxFuture<'static, Result<(), PreloadError>>>;

/// Single-flight startup preloader over a [`CacheCoordinator`].
///
/// Cloning yields a handle to the same preloader: clones share the state
/// cell and the in-flight slot. The detached worker task runs on such a
/// clone.
#[derive(Clone)]
pub struct Preloader {
    coordinator: Arc<CacheCoordinator>,
    detector: Arc<QualityDetector>,
    state: Arc<StateCell>,
    inflight: Arc<Mutex<Option<SharedRun>>>,
    retry_base: Duration,
}

impl Preloader {
    pub fn new(coordinator: Arc<CacheCoordinator>, detector: QualityDetector) -> Self {
        Self {
            coordinator,
            detector: Arc::new(detector),
            state: Arc::new(StateCell::new()),
            inflight: Arc::new(Mutex::new(None)),
            retry_base: DEFAULT_RETRY_BASE,
        }
    }

    /// Override the retry backoff base (tests use a short one).
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Current preload state snapshot.
    pub fn state(&self) -> PreloaderState {
        self.state.get()
    }

    /// Subscribe to state transitions.
    pub fn subscribe(
        &self,
        observer: impl Fn(&PreloaderState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.state.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.state.unsubscribe(id);
    }

    /// Run a preload, or join the one already in flight.
    ///
    /// The worker is detached: it completes and populates the cache even if
    /// every caller stops waiting. All callers sharing a run receive the
    /// same outcome.
    pub async fn preload(&self, request: PreloadRequest) -> Result<(), PreloadError> {
        let shared = {
            let mut slot = self.inflight.lock().unwrap();
            match slot.as_ref() {
                Some(existing) => {
                    debug!("Joining in-flight preload");
                    existing.clone()
                }
                None => {
                    let (tx, rx) = oneshot::channel();
                    let shared: SharedRun = async move {
                        rx.await.unwrap_or(Err(PreloadError::Aborted))
                    }
                    .boxed()
                    .shared();
                    *slot = Some(shared.clone());

                    let worker = self.clone();
                    tokio::spawn(async move {
                        let result = worker.run(request).await;
                        *worker.inflight.lock().unwrap() = None;
                        let _ = tx.send(result);
                    });
                    shared
                }
            }
        };
        shared.await
    }

    async fn run(&self, request: PreloadRequest) -> Result<(), PreloadError> {
        match self.run_inner(&request).await {
            Ok(()) => {
                self.state.update(PreloaderState {
                    stage: PreloadStage::Complete,
                    is_loading: false,
                    progress: 100,
                    error: None,
                });
                // A preload is the natural moment to shed anything the new
                // data displaced.
                self.coordinator.optimize().await;
                info!(restaurant = %request.restaurant_id, "Preload complete");
                Ok(())
            }
            Err(error) => {
                self.state.update(PreloaderState {
                    stage: PreloadStage::Error,
                    is_loading: false,
                    progress: self.state.get().progress,
                    error: Some(error.to_string()),
                });
                warn!(restaurant = %request.restaurant_id, %error, "Preload failed");
                Err(error)
            }
        }
    }

    async fn run_inner(&self, request: &PreloadRequest) -> Result<(), PreloadError> {
        if request.restaurant_id.trim().is_empty() {
            return Err(PreloadError::InvalidRequest(
                "restaurant id is empty".to_string(),
            ));
        }

        self.progress(PreloadStage::Fetching, 0);

        let quality = self.detector.detect().await;
        let plan = if request.adapt_to_connection {
            AdaptedPlan::for_quality(quality.kind)
        } else if quality.is_offline() {
            None
        } else {
            Some(AdaptedPlan::full())
        }
        .ok_or(PreloadError::Offline)?;
        info!(
            quality = %quality.kind,
            include_item_details = plan.include_item_details,
            max_retries = plan.max_retries,
            "Preload plan selected"
        );
        self.progress(PreloadStage::Fetching, 5);

        let metadata_key = CacheKey::new(
            DataKind::RestaurantMetadata,
            &request.restaurant_id,
            None,
            request.scope,
        );
        self.ensure(&metadata_key, &plan, request.force_refresh).await?;
        self.progress(PreloadStage::Fetching, 25);

        let categories_key = CacheKey::new(
            DataKind::Categories,
            &request.restaurant_id,
            None,
            request.scope,
        );
        self.ensure(&categories_key, &plan, request.force_refresh).await?;
        self.progress(PreloadStage::Fetching, 55);

        if plan.include_item_details {
            self.preload_item_details(request, &categories_key, &plan).await?;
        }
        Ok(())
    }

    async fn preload_item_details(
        &self,
        request: &PreloadRequest,
        categories_key: &CacheKey,
        plan: &AdaptedPlan,
    ) -> Result<(), PreloadError> {
        let cached = self
            .coordinator
            .get(categories_key)
            .await
            .map_err(|e| PreloadError::Exhausted {
                attempts: 1,
                last_error: e.to_string(),
            })?;
        let categories: Vec<Category> = match cached.map(serde_json::from_value) {
            Some(Ok(categories)) => categories,
            Some(Err(error)) => {
                warn!(%error, "Cached categories are not a category list, skipping item details");
                return Ok(());
            }
            None => return Ok(()),
        };

        let item_ids: Vec<String> = categories
            .iter()
            .flat_map(|category| category.items.iter().map(|item| item.id.clone()))
            .collect();
        let total = item_ids.len().max(1);

        for (index, item_id) in item_ids.iter().enumerate() {
            let key = CacheKey::new(
                DataKind::MenuItemDetails,
                &request.restaurant_id,
                Some(item_id),
                request.scope,
            );
            self.ensure(&key, plan, request.force_refresh).await?;
            let step = 55 + (40 * (index + 1) / total) as u8;
            self.progress(PreloadStage::Fetching, step);
        }
        Ok(())
    }

    /// Make sure one key is populated: skip when a usable cached value
    /// exists, otherwise refetch with retries.
    async fn ensure(
        &self,
        key: &CacheKey,
        plan: &AdaptedPlan,
        force_refresh: bool,
    ) -> Result<(), PreloadError> {
        if !force_refresh {
            if let Ok(Some(_)) = self.coordinator.get(key).await {
                return Ok(());
            }
        }

        let mut attempt: u32 = 0;
        loop {
            match self.coordinator.refresh_now(key).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    attempt += 1;
                    if attempt > plan.max_retries {
                        return Err(PreloadError::Exhausted {
                            attempts: attempt,
                            last_error: error.to_string(),
                        });
                    }
                    // The flag can flip mid-run; retrying a dead link only
                    // delays the error surface.
                    if !self.detector.status().is_online() {
                        return Err(PreloadError::Offline);
                    }

                    let base_ms = self.retry_base.as_millis() as u64;
                    let backoff_ms = base_ms * (1u64 << (attempt - 1));
                    let jitter_ms = rand::rng().random_range(0..=base_ms / 2);
                    debug!(
                        attempt,
                        backoff_ms = backoff_ms + jitter_ms,
                        %error,
                        "Preload step failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms + jitter_ms)).await;
                }
            }
        }
    }

    fn progress(&self, stage: PreloadStage, progress: u8) {
        self.state.update(PreloaderState {
            stage,
            is_loading: true,
            progress,
            error: None,
        });
    }
}
