//! Fixture-backed data source.
//!
//! Serves a restaurant's data from an in-memory fixture, optionally loaded
//! from a JSON file. Used by the CLI demo and by integration tests; supports
//! simulated latency and scripted failures so retry behavior can be
//! exercised without a network.

use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use super::{DataSource, FetchError};
use crate::model::{Category, MenuItemDetails, Restaurant};

/// Complete data set for one restaurant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub restaurant: Restaurant,
    pub categories: Vec<Category>,
    #[serde(default)]
    pub item_details: Vec<MenuItemDetails>,
}

impl Fixture {
    /// Load a fixture from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FetchError> {
        let bytes = tokio::fs::read(path.as_ref())
            .await
            .map_err(|e| FetchError::new(format!("cannot read fixture: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::new(format!("cannot parse fixture: {e}")))
    }
}

/// Data source serving a [`Fixture`].
pub struct FixtureSource {
    fixture: Fixture,
    latency: Option<Duration>,
    /// Number of upcoming calls that fail before requests succeed again.
    fail_next: AtomicUsize,
    fetch_count: AtomicU64,
}

impl FixtureSource {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            latency: None,
            fail_next: AtomicUsize::new(0),
            fetch_count: AtomicU64::new(0),
        }
    }

    /// Add a fixed delay to every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next `count` fetches fail with a transient error.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Total fetches attempted, successful or not.
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    async fn before_fetch(&self) -> Result<(), FetchError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let remaining = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if remaining {
            return Err(FetchError::new("simulated network failure"));
        }
        Ok(())
    }

    fn check_restaurant(&self, restaurant_id: &str) -> Result<(), FetchError> {
        if restaurant_id == self.fixture.restaurant.id {
            Ok(())
        } else {
            Err(FetchError::new(format!(
                "unknown restaurant: {restaurant_id}"
            )))
        }
    }
}

impl DataSource for FixtureSource {
    fn fetch_restaurant_metadata<'a>(
        &'a self,
        restaurant_id: &'a str,
    ) -> BoxFuture<'a, Result<Restaurant, FetchError>> {
        async move {
            self.before_fetch().await?;
            self.check_restaurant(restaurant_id)?;
            Ok(self.fixture.restaurant.clone())
        }
        .boxed()
    }

    fn fetch_categories<'a>(
        &'a self,
        restaurant_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Category>, FetchError>> {
        async move {
            self.before_fetch().await?;
            self.check_restaurant(restaurant_id)?;
            Ok(self.fixture.categories.clone())
        }
        .boxed()
    }

    fn fetch_menu_item_details<'a>(
        &'a self,
        item_id: &'a str,
    ) -> BoxFuture<'a, Result<MenuItemDetails, FetchError>> {
        async move {
            self.before_fetch().await?;
            self.fixture
                .item_details
                .iter()
                .find(|d| d.id == item_id)
                .cloned()
                .ok_or_else(|| FetchError::new(format!("unknown item: {item_id}")))
        }
        .boxed()
    }
}

/// Fixture used across the crate's test suites: one restaurant, one
/// category, one item with details.
#[cfg(test)]
pub(crate) fn sample_fixture() -> Fixture {
    use crate::model::MenuItem;

    Fixture {
        restaurant: Restaurant {
            id: "r1".to_string(),
            name: "Blue Door Diner".to_string(),
            address: None,
            logo_url: None,
            accepting_orders: true,
        },
        categories: vec![Category {
            id: "c1".to_string(),
            name: "Mains".to_string(),
            sort_order: 0,
            items: vec![MenuItem {
                id: "i1".to_string(),
                name: "Burger".to_string(),
                price_cents: 990,
                image_url: Some("https://img.example/i1.jpg".to_string()),
                available: true,
            }],
        }],
        item_details: vec![MenuItemDetails {
            id: "i1".to_string(),
            name: "Burger".to_string(),
            price_cents: 990,
            description: None,
            image_url: Some("https://img.example/i1.jpg".to_string()),
            options: vec![],
            allergens: vec![],
        }],
    }
}
