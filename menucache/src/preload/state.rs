//! Observable preload state.
//!
//! UI surfaces (the kiosk splash screen, the CLI progress line) subscribe to
//! state transitions instead of polling. Progress is monotonic within one
//! run: a later update never reports a smaller percentage than an earlier
//! one. Subscriber panics are isolated, and every subscription can be torn
//! down independently.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::warn;

/// Where a preload run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreloadStage {
    #[default]
    Idle,
    Fetching,
    Complete,
    Error,
}

/// Snapshot of the preloader, delivered to subscribers on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreloaderState {
    pub stage: PreloadStage,
    pub is_loading: bool,
    /// 0 to 100, monotonic within a run.
    pub progress: u8,
    pub error: Option<String>,
}

/// Handle returned by [`StateCell::subscribe`]; pass back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type StateObserver = Box<dyn Fn(&PreloaderState) + Send + Sync>;

/// Current state plus its subscriber list.
#[derive(Default)]
pub struct StateCell {
    state: Mutex<PreloaderState>,
    observers: Mutex<Vec<(u64, StateObserver)>>,
    next_id: AtomicU64,
}

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn get(&self) -> PreloaderState {
        self.state.lock().unwrap().clone()
    }

    /// Replace the state and notify subscribers. Progress is clamped so it
    /// never moves backwards while a run is loading.
    pub fn update(&self, mut next: PreloaderState) {
        {
            let mut state = self.state.lock().unwrap();
            if state.is_loading && next.is_loading {
                next.progress = next.progress.max(state.progress);
            }
            *state = next.clone();
        }

        let observers = self.observers.lock().unwrap();
        for (_, observer) in observers.iter() {
            if catch_unwind(AssertUnwindSafe(|| observer(&next))).is_err() {
                warn!("Preload state subscriber panicked");
            }
        }
    }

    /// Register a subscriber; it is not called with the current state, only
    /// with subsequent transitions.
    pub fn subscribe(&self, observer: impl Fn(&PreloaderState) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.lock().unwrap().push((id, Box::new(observer)));
        SubscriptionId(id)
    }

    /// Remove one subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.observers
            .lock()
            .unwrap()
            .retain(|(existing, _)| *existing != id.0);
    }
}
