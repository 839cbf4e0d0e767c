//! Cart types as persisted by the cart cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current layout of [`CartSnapshot`]. Snapshots written with any other
/// version are discarded on read.
pub const CART_SCHEMA_VERSION: u32 = 1;

/// Price with currency, amounts kept as decimal strings as the storefront
/// returns them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: String,
    pub currency_code: String,
}

impl Money {
    pub fn new(amount: impl Into<String>, currency_code: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            currency_code: currency_code.into(),
        }
    }
}

/// Ticket details attached to cart items that are event tickets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    pub event_id: String,
    pub name: String,
    pub date: String,
    #[serde(default)]
    pub venue: Option<String>,
}

/// Identity of a cart line: same product, colour and size merge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartItemKey {
    pub product_id: String,
    pub selected_color: String,
    pub selected_size: String,
}

impl CartItemKey {
    pub fn new(
        product_id: impl Into<String>,
        selected_color: impl Into<String>,
        selected_size: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            selected_color: selected_color.into(),
            selected_size: selected_size.into(),
        }
    }
}

/// One cart line in its persisted shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineCartItem {
    pub product_id: String,
    pub title: String,
    pub price: Money,
    pub selected_color: String,
    pub selected_size: String,
    pub selected_quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub event_details: Option<EventDetails>,
    pub added_at: DateTime<Utc>,
}

impl OfflineCartItem {
    pub fn key(&self) -> CartItemKey {
        CartItemKey::new(
            self.product_id.clone(),
            self.selected_color.clone(),
            self.selected_size.clone(),
        )
    }

    pub fn matches(&self, key: &CartItemKey) -> bool {
        self.product_id == key.product_id
            && self.selected_color == key.selected_color
            && self.selected_size == key.selected_size
    }
}

/// Persisted cart payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub version: u32,
    pub items: Vec<OfflineCartItem>,
}

impl CartSnapshot {
    pub fn new(items: Vec<OfflineCartItem>) -> Self {
        Self {
            version: CART_SCHEMA_VERSION,
            items,
        }
    }

    pub fn is_current_version(&self) -> bool {
        self.version == CART_SCHEMA_VERSION
    }

    /// Total number of units across all lines
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.selected_quantity).sum()
    }
}

/// Add `item` to `items`, merging with an existing line of the same key.
///
/// A merge adds the quantities and keeps the existing line's position and
/// `addedAt`. Returns `true` when an existing line was merged into.
pub fn merge_item(items: &mut Vec<OfflineCartItem>, item: OfflineCartItem) -> bool {
    let key = item.key();
    match items.iter_mut().find(|existing| existing.matches(&key)) {
        Some(existing) => {
            existing.selected_quantity = existing
                .selected_quantity
                .saturating_add(item.selected_quantity);
            true
        }
        None => {
            items.push(item);
            false
        }
    }
}
