//! Shared online/offline status with observer registration.
//!
//! Replaces direct binding to a runtime's global online/offline events: the
//! embedding application pushes transitions into `set_online`, and interested
//! components either poll `is_online` or register a callback. Observer panics
//! are isolated so one bad callback cannot block delivery to the rest.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::warn;

type StatusObserver = Box<dyn Fn(bool) + Send + Sync>;

/// Thread-safe online/offline flag with change notification.
pub struct ConnectionStatus {
    online: AtomicBool,
    observers: Mutex<Vec<StatusObserver>>,
}

impl std::fmt::Debug for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionStatus")
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectionStatus {
    /// Create a status handle with the given initial state.
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Current online flag.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Push an online/offline transition. No-op (and no notification) when
    /// the state is unchanged.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::Relaxed);
        if previous == online {
            return;
        }

        let observers = self.observers.lock().unwrap();
        for observer in observers.iter() {
            if catch_unwind(AssertUnwindSafe(|| observer(online))).is_err() {
                warn!("Connectivity observer panicked");
            }
        }
    }

    /// Register a callback invoked on every online/offline transition.
    pub fn on_change(&self, observer: impl Fn(bool) + Send + Sync + 'static) {
        self.observers.lock().unwrap().push(Box::new(observer));
    }
}
