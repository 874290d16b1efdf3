//! Data-source collaborator.
//!
//! The ultimate origin of menu data sits outside this crate: the kiosk
//! application wires in whatever backend client it uses. The cache treats
//! every fetch rejection identically (retry or fall back), so the error type
//! is deliberately opaque.

mod fixture;

pub use fixture::{Fixture, FixtureSource};

#[cfg(test)]
pub(crate) use fixture::sample_fixture;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::model::{Category, MenuItemDetails, Restaurant};

/// A fetch that failed. The cache never branches on the cause.
#[derive(Debug, Clone, Error)]
#[error("fetch failed: {0}")]
pub struct FetchError(pub String);

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Asynchronous origin of restaurant and menu data.
pub trait DataSource: Send + Sync {
    /// Fetch restaurant metadata for a tenant.
    fn fetch_restaurant_metadata<'a>(
        &'a self,
        restaurant_id: &'a str,
    ) -> BoxFuture<'a, Result<Restaurant, FetchError>>;

    /// Fetch menu categories (items nested) for a tenant.
    fn fetch_categories<'a>(
        &'a self,
        restaurant_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Category>, FetchError>>;

    /// Fetch the full detail record for one menu item.
    fn fetch_menu_item_details<'a>(
        &'a self,
        item_id: &'a str,
    ) -> BoxFuture<'a, Result<MenuItemDetails, FetchError>>;
}
