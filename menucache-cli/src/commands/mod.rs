//! CLI command implementations.
//!
//! - [`preload`] - Warm the cache for a restaurant from a fixture file
//! - [`stats`] - Diagnostics report for a cache directory
//! - [`clear`] - Remove cached entries

pub mod clear;
pub mod common;
pub mod preload;
pub mod stats;
