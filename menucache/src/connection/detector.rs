//! Connection-quality detector.
//!
//! Combines the explicit online/offline signal, an optional platform
//! connection-type hint, and a lightweight round-trip probe into a
//! [`ConnectionQuality`] snapshot. Cheap enough to run before every preload
//! cycle: the probe is bounded by a short timeout, and a probe that times
//! out or fails classifies as slow rather than offline, since the absence of
//! a response does not prove the absence of connectivity.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::debug;

use super::quality::{ConnectionHint, ConnectionQuality, QualityKind};
use super::status::ConnectionStatus;

/// Default ceiling on how long a probe may run.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Lightweight connectivity probe.
///
/// Implementations measure one round trip to a known-cheap endpoint.
/// Returning `None` means the probe itself failed (which is not an offline
/// signal).
pub trait ConnectivityProbe: Send + Sync {
    /// Measure one round trip. Should resolve well inside the detector's
    /// probe timeout under healthy conditions.
    fn measure_rtt(&self) -> BoxFuture<'_, Option<Duration>>;

    /// Platform connection-type hint, when the host environment exposes one.
    fn hint(&self) -> Option<ConnectionHint> {
        None
    }
}

/// Classifies current connectivity on demand.
pub struct QualityDetector {
    status: Arc<ConnectionStatus>,
    probe: Arc<dyn ConnectivityProbe>,
    probe_timeout: Duration,
}

impl QualityDetector {
    /// Create a detector over the shared status flag and a probe.
    pub fn new(status: Arc<ConnectionStatus>, probe: Arc<dyn ConnectivityProbe>) -> Self {
        Self {
            status,
            probe,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// The shared status handle this detector reads.
    pub fn status(&self) -> Arc<ConnectionStatus> {
        Arc::clone(&self.status)
    }

    /// Classify current connectivity.
    ///
    /// Short-circuits to offline from the explicit flag. Otherwise the
    /// platform hint wins when present; the measured round trip is the
    /// fallback. Probe timeout or failure classifies as slow.
    pub async fn detect(&self) -> ConnectionQuality {
        if !self.status.is_online() {
            return ConnectionQuality::offline();
        }

        let hint = self.probe.hint();
        let rtt = match tokio::time::timeout(self.probe_timeout, self.probe.measure_rtt()).await {
            Ok(rtt) => rtt,
            Err(_) => {
                debug!(
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "Connectivity probe timed out"
                );
                None
            }
        };

        let kind = match (hint, rtt) {
            (Some(hint), _) => hint.quality(),
            (None, Some(rtt)) => ConnectionQuality::classify_rtt(rtt),
            // Probe failed but we are not provably offline
            (None, None) => QualityKind::Slow,
        };

        ConnectionQuality {
            kind,
            round_trip_time: rtt,
            hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct FakeProbe {
        rtt: Option<Duration>,
        hint: Option<ConnectionHint>,
        delay: Option<Duration>,
    }

    impl FakeProbe {
        fn with_rtt(rtt_ms: u64) -> Self {
            Self {
                rtt: Some(Duration::from_millis(rtt_ms)),
                hint: None,
                delay: None,
            }
        }
    }

    impl ConnectivityProbe for FakeProbe {
        fn measure_rtt(&self) -> BoxFuture<'_, Option<Duration>> {
            let rtt = self.rtt;
            let delay = self.delay;
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                rtt
            }
            .boxed()
        }

        fn hint(&self) -> Option<ConnectionHint> {
            self.hint
        }
    }

    fn detector(probe: FakeProbe, online: bool) -> QualityDetector {
        QualityDetector::new(Arc::new(ConnectionStatus::new(online)), Arc::new(probe))
    }

    #[tokio::test]
    async fn offline_flag_short_circuits() {
        let detector = detector(FakeProbe::with_rtt(10), false);
        let quality = detector.detect().await;
        assert_eq!(quality.kind, QualityKind::Offline);
        assert_eq!(quality.round_trip_time, None);
    }

    #[tokio::test]
    async fn fast_rtt_classifies_fast() {
        let detector = detector(FakeProbe::with_rtt(50), true);
        assert_eq!(detector.detect().await.kind, QualityKind::Fast);
    }

    #[tokio::test]
    async fn slow_rtt_classifies_slow() {
        let detector = detector(FakeProbe::with_rtt(800), true);
        assert_eq!(detector.detect().await.kind, QualityKind::Slow);
    }

    #[tokio::test]
    async fn hint_takes_precedence_over_rtt() {
        let probe = FakeProbe {
            rtt: Some(Duration::from_millis(50)), // would be Fast
            hint: Some(ConnectionHint::Cellular3g),
            delay: None,
        };
        let detector = detector(probe, true);

        let quality = detector.detect().await;
        assert_eq!(quality.kind, QualityKind::Medium);
        assert_eq!(quality.hint, Some(ConnectionHint::Cellular3g));
    }

    #[tokio::test]
    async fn probe_timeout_classifies_slow_not_offline() {
        let probe = FakeProbe {
            rtt: Some(Duration::from_millis(10)),
            hint: None,
            delay: Some(Duration::from_secs(5)),
        };
        let detector = detector(probe, true).with_probe_timeout(Duration::from_millis(20));

        let quality = detector.detect().await;
        assert_eq!(quality.kind, QualityKind::Slow);
        assert!(!quality.is_offline());
    }

    #[tokio::test]
    async fn failed_probe_classifies_slow() {
        let probe = FakeProbe {
            rtt: None,
            hint: None,
            delay: None,
        };
        let detector = detector(probe, true);
        assert_eq!(detector.detect().await.kind, QualityKind::Slow);
    }
}
