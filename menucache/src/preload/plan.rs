//! Preload request and the connection-adapted plan.

use crate::connection::QualityKind;
use crate::coordinator::Scope;
use thiserror::Error;

/// One startup preload request.
#[derive(Debug, Clone)]
pub struct PreloadRequest {
    pub restaurant_id: String,
    /// Refetch everything, ignoring fresh cached entries.
    pub force_refresh: bool,
    /// Which cache surface to warm.
    pub scope: Scope,
    /// When false, every quality short of offline gets the full plan.
    pub adapt_to_connection: bool,
}

impl PreloadRequest {
    pub fn new(restaurant_id: impl Into<String>) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            force_refresh: false,
            scope: Scope::Customer,
            adapt_to_connection: true,
        }
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_adaptation(mut self, adapt: bool) -> Self {
        self.adapt_to_connection = adapt;
        self
    }
}

/// How much the preload attempts given the current connection.
///
/// On slow connections the plan keeps the kiosk bootable (metadata and
/// categories) and defers the per-item detail records to on-demand reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptedPlan {
    pub include_item_details: bool,
    /// Additional attempts after the first failure, per step.
    pub max_retries: u32,
}

impl AdaptedPlan {
    /// The plan for a quality classification. `None` means offline: there is
    /// nothing a preload can do.
    pub fn for_quality(kind: QualityKind) -> Option<Self> {
        match kind {
            QualityKind::Fast => Some(Self {
                include_item_details: true,
                max_retries: 3,
            }),
            QualityKind::Medium => Some(Self {
                include_item_details: true,
                max_retries: 2,
            }),
            QualityKind::Slow => Some(Self {
                include_item_details: false,
                max_retries: 1,
            }),
            QualityKind::Offline => None,
        }
    }

    /// The plan used when adaptation is disabled.
    pub fn full() -> Self {
        Self {
            include_item_details: true,
            max_retries: 3,
        }
    }
}

/// Why a preload run did not complete.
///
/// `Clone` because every caller sharing an in-flight run receives the same
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreloadError {
    /// The device is offline; nothing was fetched.
    #[error("cannot preload while offline")]
    Offline,

    /// The run was abandoned before producing a result.
    #[error("preload aborted")]
    Aborted,

    /// Every retry of one step failed.
    #[error("preload gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// The request itself was unusable.
    #[error("invalid preload request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_gets_the_full_plan() {
        let plan = AdaptedPlan::for_quality(QualityKind::Fast).unwrap();
        assert!(plan.include_item_details);
        assert_eq!(plan.max_retries, 3);
    }

    #[test]
    fn slow_defers_item_details() {
        let plan = AdaptedPlan::for_quality(QualityKind::Slow).unwrap();
        assert!(!plan.include_item_details);
        assert_eq!(plan.max_retries, 1);
    }

    #[test]
    fn offline_has_no_plan() {
        assert_eq!(AdaptedPlan::for_quality(QualityKind::Offline), None);
    }

    #[test]
    fn retries_scale_down_with_quality() {
        let fast = AdaptedPlan::for_quality(QualityKind::Fast).unwrap();
        let medium = AdaptedPlan::for_quality(QualityKind::Medium).unwrap();
        let slow = AdaptedPlan::for_quality(QualityKind::Slow).unwrap();
        assert!(fast.max_retries > medium.max_retries);
        assert!(medium.max_retries > slow.max_retries);
    }
}
