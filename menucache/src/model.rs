//! Domain payloads served by the cache.
//!
//! These mirror what the kiosk backend returns: restaurant metadata, menu
//! categories with nested items, and per-item detail records. The cache
//! itself stores them as opaque JSON values; these types exist so the data
//! source and preloader have a concrete contract.

use serde::{Deserialize, Serialize};

/// Restaurant metadata shown on the kiosk landing screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    /// Tenant identifier; scopes every cache entry.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Whether the restaurant is currently accepting orders.
    #[serde(default)]
    pub accepting_orders: bool,
}

/// A menu category with its items nested inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Display position within the menu.
    #[serde(default)]
    pub sort_order: u32,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

/// Summary form of a menu item as it appears inside a category listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    /// Price in minor currency units (cents).
    pub price_cents: u64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub available: bool,
}

/// Full detail record for a single menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemDetails {
    pub id: String,
    pub name: String,
    pub price_cents: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub options: Vec<ItemOption>,
    #[serde(default)]
    pub allergens: Vec<String>,
}

/// A configurable option on a menu item (size, extras, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOption {
    pub id: String,
    pub name: String,
    /// Price delta in minor currency units; may be zero.
    #[serde(default)]
    pub price_delta_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restaurant_round_trips_through_json() {
        let restaurant = Restaurant {
            id: "r1".to_string(),
            name: "Blue Door Diner".to_string(),
            address: Some("12 Main St".to_string()),
            logo_url: None,
            accepting_orders: true,
        };

        let json = serde_json::to_string(&restaurant).unwrap();
        let back: Restaurant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, restaurant);
    }

    #[test]
    fn category_defaults_apply_on_sparse_input() {
        let category: Category = serde_json::from_str(r#"{"id":"c1","name":"Mains"}"#).unwrap();

        assert_eq!(category.sort_order, 0);
        assert!(category.items.is_empty());
    }

    #[test]
    fn item_details_round_trip() {
        let details = MenuItemDetails {
            id: "i9".to_string(),
            name: "Veggie Burger".to_string(),
            price_cents: 1250,
            description: Some("House patty".to_string()),
            image_url: Some("https://img.example/i9.jpg".to_string()),
            options: vec![ItemOption {
                id: "o1".to_string(),
                name: "Large".to_string(),
                price_delta_cents: 200,
            }],
            allergens: vec!["soy".to_string()],
        };

        let value = serde_json::to_value(&details).unwrap();
        let back: MenuItemDetails = serde_json::from_value(value).unwrap();
        assert_eq!(back, details);
    }
}
