//! Cache key construction and the persisted key layout.
//!
//! Every entry is scoped by restaurant (tenant) and by surface (customer
//! kiosk vs admin dashboard). The persisted form is
//! `<namespace>_<restaurant>_<kind>_<entity?>`, with the admin scope folded
//! into the namespace segment so the four-part layout holds for both
//! surfaces. Segments are sanitized on construction so a key is always a
//! safe storage token.

use crate::strategy::DataKind;

/// Which surface a cached entry belongs to.
///
/// Admin screens may hold drafts and unpublished edits, so their cache never
/// mixes with the customer-facing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    #[default]
    Customer,
    Admin,
}

/// Unique identity of one cached value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: DataKind,
    pub restaurant_id: String,
    /// Present for per-entity kinds (menu item details).
    pub entity_id: Option<String>,
    pub scope: Scope,
}

impl CacheKey {
    /// Create a key, sanitizing tenant and entity segments.
    pub fn new(
        kind: DataKind,
        restaurant_id: impl AsRef<str>,
        entity_id: Option<&str>,
        scope: Scope,
    ) -> Self {
        Self {
            kind,
            restaurant_id: sanitize_segment(restaurant_id.as_ref()),
            entity_id: entity_id.map(sanitize_segment),
            scope,
        }
    }

    /// The persisted key string under the given namespace.
    pub fn storage_key(&self, namespace: &str) -> String {
        let ns = match self.scope {
            Scope::Customer => namespace.to_string(),
            Scope::Admin => format!("{namespace}-admin"),
        };
        match &self.entity_id {
            Some(entity) => format!("{ns}_{}_{}_{entity}", self.restaurant_id, self.kind),
            None => format!("{ns}_{}_{}", self.restaurant_id, self.kind),
        }
    }

    /// Parse a persisted key back into its parts. Returns `None` for keys
    /// from a different namespace or with an unknown layout.
    pub fn parse(namespace: &str, storage_key: &str) -> Option<Self> {
        let admin_ns = format!("{namespace}-admin_");
        let (scope, rest) = if let Some(rest) = storage_key.strip_prefix(&admin_ns) {
            (Scope::Admin, rest)
        } else if let Some(rest) = storage_key.strip_prefix(&format!("{namespace}_")) {
            (Scope::Customer, rest)
        } else {
            return None;
        };

        let mut parts = rest.split('_');
        let restaurant_id = parts.next()?.to_string();
        let kind = DataKind::parse(parts.next()?)?;
        let entity_id = parts.next().map(String::from);
        if parts.next().is_some() || restaurant_id.is_empty() {
            return None;
        }

        Some(Self {
            kind,
            restaurant_id,
            entity_id,
            scope,
        })
    }
}

/// Keep key segments to `[A-Za-z0-9-]` so they never collide with the `_`
/// separators or the filesystem.
fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}
