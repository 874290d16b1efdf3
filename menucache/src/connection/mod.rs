//! Connection-quality detection.
//!
//! Classifies current network conditions as fast/medium/slow/offline so the
//! preloader can adapt retry counts and image fetching. Offline is only ever
//! asserted from the explicit online/offline signal; a hung or failed probe
//! classifies as slow.

mod detector;
mod quality;
mod status;

pub use detector::{ConnectivityProbe, QualityDetector};
pub use quality::{ConnectionHint, ConnectionQuality, QualityKind};
pub use status::ConnectionStatus;
