//! Cart cache - the whole cart as one snapshot

use chrono::Duration;
use tracing::{debug, warn};

use super::{discard, load_or_empty, persist};
use crate::clock::SharedClock;
use crate::storage::{keys, SharedStore};
use crate::types::{merge_item, CacheRecord, CartItemKey, CartSnapshot, OfflineCartItem};

/// Cached cart snapshot.
///
/// The snapshot is replaced on every mutation and the key is removed once
/// the cart is empty.
#[derive(Clone)]
pub struct CartCache {
    store: SharedStore,
    clock: SharedClock,
    max_age: Duration,
}

impl CartCache {
    pub fn new(store: SharedStore, clock: SharedClock, max_age: Duration) -> Self {
        Self {
            store,
            clock,
            max_age,
        }
    }

    /// Replace the cached cart with `items`.
    ///
    /// Returns whether the write reached storage.
    pub fn save(&self, items: &[OfflineCartItem]) -> bool {
        if items.is_empty() {
            debug!("Cart empty, clearing cached snapshot");
            return discard(self.store.as_ref(), keys::CART);
        }

        let record = CacheRecord::new(CartSnapshot::new(items.to_vec()), self.clock.now());
        let saved = persist(self.store.as_ref(), keys::CART, &record);
        if saved {
            debug!(lines = items.len(), "Cart snapshot cached");
        }
        saved
    }

    /// The fresh cached snapshot, if any.
    ///
    /// Snapshots from another schema version or past the freshness window
    /// are removed from storage and reported as absent.
    pub fn snapshot(&self) -> Option<CacheRecord<CartSnapshot>> {
        let record: CacheRecord<CartSnapshot> = load_or_empty(self.store.as_ref(), keys::CART)?;

        if !record.value.is_current_version() {
            warn!(
                found = record.value.version,
                "Discarding cart snapshot with unsupported schema version"
            );
            discard(self.store.as_ref(), keys::CART);
            return None;
        }

        if record.is_expired(self.clock.now(), self.max_age) {
            debug!(cached_at = %record.cached_at, "Cart snapshot expired");
            discard(self.store.as_ref(), keys::CART);
            return None;
        }

        Some(record)
    }

    /// All cached cart lines, in cart order
    pub fn load(&self) -> Vec<OfflineCartItem> {
        self.snapshot()
            .map(|record| record.value.items)
            .unwrap_or_default()
    }

    /// The cached line with this key
    pub fn find(&self, key: &CartItemKey) -> Option<OfflineCartItem> {
        self.load().into_iter().find(|item| item.matches(key))
    }

    /// Add an item, merging quantities with an existing line of the same
    /// product, colour and size. Returns the resulting cart.
    pub fn add_item(&self, item: OfflineCartItem) -> Vec<OfflineCartItem> {
        let mut items = self.load();
        merge_item(&mut items, item);
        self.save(&items);
        items
    }

    /// Set a line's quantity; zero removes the line. Returns the resulting cart.
    pub fn set_quantity(&self, key: &CartItemKey, quantity: u32) -> Vec<OfflineCartItem> {
        let mut items = self.load();
        if quantity == 0 {
            items.retain(|item| !item.matches(key));
        } else if let Some(item) = items.iter_mut().find(|item| item.matches(key)) {
            item.selected_quantity = quantity;
        }
        self.save(&items);
        items
    }

    /// Remove a line. Returns the resulting cart.
    pub fn remove_item(&self, key: &CartItemKey) -> Vec<OfflineCartItem> {
        self.set_quantity(key, 0)
    }

    /// Drop the cached cart
    pub fn clear(&self) -> bool {
        discard(self.store.as_ref(), keys::CART)
    }

    /// Total units in the cached cart
    pub fn item_count(&self) -> u32 {
        self.snapshot()
            .map(|record| record.value.item_count())
            .unwrap_or(0)
    }
}
