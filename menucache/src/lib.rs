//! MenuCache - client-side cache coordination for restaurant ordering kiosks.
//!
//! This library implements the caching layer that sits between a kiosk UI and
//! its remote backend: a two-tier cache (memory + persistent store) for menu
//! and restaurant data, with stale-while-revalidate background refresh,
//! hit/miss metrics, priority-weighted eviction under memory pressure, and a
//! connection-quality-adaptive startup preloader.
//!
//! # High-Level API
//!
//! The [`coordinator`] module is the single entry point for cached reads and
//! writes; the [`preload`] module warms the cache for a restaurant scope:
//!
//! ```ignore
//! use menucache::coordinator::{CacheCoordinator, CacheKey, Scope};
//! use menucache::preload::{Preloader, PreloadRequest};
//! use menucache::strategy::DataKind;
//!
//! let coordinator = Arc::new(CacheCoordinator::new(store, source));
//! let preloader = Arc::new(Preloader::new(Arc::clone(&coordinator), detector));
//!
//! preloader.preload(PreloadRequest::new("r1")).await?;
//! let key = CacheKey::new(DataKind::Categories, "r1", None, Scope::Customer);
//! let categories = coordinator.get(&key).await?;
//! ```

pub mod connection;
pub mod coordinator;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod preload;
pub mod source;
pub mod store;
pub mod strategy;
pub mod time;

/// Version of the MenuCache library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
