//! Connection quality classification.

use std::time::Duration;

/// Round-trip time below which a connection classifies as fast.
pub const FAST_RTT_CEILING: Duration = Duration::from_millis(100);

/// Round-trip time below which a connection classifies as medium.
pub const MEDIUM_RTT_CEILING: Duration = Duration::from_millis(300);

/// Coarse connectivity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityKind {
    Fast,
    Medium,
    #[default]
    Slow,
    Offline,
}

impl std::fmt::Display for QualityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Medium => write!(f, "medium"),
            Self::Slow => write!(f, "slow"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Platform-reported connection type hint.
///
/// When present, the hint takes precedence over the measured round-trip
/// time; RTT is the fallback heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionHint {
    /// "4g" or better.
    Cellular4g,
    /// "3g".
    Cellular3g,
    /// "2g" or "slow-2g".
    Cellular2g,
}

impl ConnectionHint {
    /// Direct mapping from hint to quality.
    pub fn quality(&self) -> QualityKind {
        match self {
            Self::Cellular4g => QualityKind::Fast,
            Self::Cellular3g => QualityKind::Medium,
            Self::Cellular2g => QualityKind::Slow,
        }
    }

    /// Parse a platform hint string ("4g", "3g", "2g", "slow-2g").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "4g" => Some(Self::Cellular4g),
            "3g" => Some(Self::Cellular3g),
            "2g" | "slow-2g" => Some(Self::Cellular2g),
            _ => None,
        }
    }
}

/// A classification snapshot, recomputed on demand and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionQuality {
    pub kind: QualityKind,
    /// Measured round-trip time, when the probe ran.
    pub round_trip_time: Option<Duration>,
    /// Platform hint, when one was available.
    pub hint: Option<ConnectionHint>,
}

impl ConnectionQuality {
    /// The offline snapshot.
    pub fn offline() -> Self {
        Self {
            kind: QualityKind::Offline,
            round_trip_time: None,
            hint: None,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.kind == QualityKind::Offline
    }

    /// Classify a measured round-trip time.
    pub fn classify_rtt(rtt: Duration) -> QualityKind {
        if rtt < FAST_RTT_CEILING {
            QualityKind::Fast
        } else if rtt < MEDIUM_RTT_CEILING {
            QualityKind::Medium
        } else {
            QualityKind::Slow
        }
    }
}
