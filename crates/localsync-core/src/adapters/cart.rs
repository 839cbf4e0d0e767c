//! Cart adapter: keeps the cached cart in step with the app's live cart

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::CartCache;
use crate::clock::SharedClock;
use crate::engine::SyncEngine;
use crate::sync::SyncCallback;
use crate::types::{merge_item, CartItemKey, EventDetails, Money, OfflineCartItem};

/// One line of the app's in-memory cart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub title: String,
    pub price: Money,
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: u32,
    pub image: Option<String>,
    pub event: Option<EventDetails>,
}

/// The app's live cart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub lines: Vec<CartLine>,
}

impl CartLine {
    fn key(&self) -> CartItemKey {
        CartItemKey::new(
            self.product_id.clone(),
            self.color.clone().unwrap_or_default(),
            self.size.clone().unwrap_or_default(),
        )
    }

    fn to_offline(&self, added_at: DateTime<Utc>) -> OfflineCartItem {
        OfflineCartItem {
            product_id: self.product_id.clone(),
            title: self.title.clone(),
            price: self.price.clone(),
            selected_color: self.color.clone().unwrap_or_default(),
            selected_size: self.size.clone().unwrap_or_default(),
            selected_quantity: self.quantity,
            image: self.image.clone(),
            variant_id: self.variant_id.clone(),
            event_details: self.event.clone(),
            added_at,
        }
    }
}

impl From<&OfflineCartItem> for CartLine {
    fn from(item: &OfflineCartItem) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            product_id: item.product_id.clone(),
            variant_id: item.variant_id.clone(),
            title: item.title.clone(),
            price: item.price.clone(),
            color: non_empty(&item.selected_color),
            size: non_empty(&item.selected_size),
            quantity: item.selected_quantity,
            image: item.image.clone(),
            event: item.event_details.clone(),
        }
    }
}

/// Convert the live cart to its persisted shape.
///
/// Lines already in `previous` keep their `addedAt`; new lines get `now`.
/// Zero-quantity lines are dropped and lines sharing a key are merged.
pub fn to_offline_items(
    state: &CartState,
    previous: &[OfflineCartItem],
    now: DateTime<Utc>,
) -> Vec<OfflineCartItem> {
    state
        .lines
        .iter()
        .filter(|line| line.quantity > 0)
        .map(|line| {
            let key = line.key();
            let added_at = previous
                .iter()
                .find(|item| item.matches(&key))
                .map(|item| item.added_at)
                .unwrap_or(now);
            line.to_offline(added_at)
        })
        .fold(Vec::new(), |mut items, item| {
            merge_item(&mut items, item);
            items
        })
}

/// Rebuild the live cart from persisted items
pub fn to_cart_state(items: &[OfflineCartItem]) -> CartState {
    CartState {
        lines: items.iter().map(CartLine::from).collect(),
    }
}

/// Whether `next` differs from `previous` in anything but `addedAt`
pub fn cart_changed(previous: &[OfflineCartItem], next: &[OfflineCartItem]) -> bool {
    if previous.len() != next.len() {
        return true;
    }
    previous.iter().zip(next).any(|(a, b)| {
        a.product_id != b.product_id
            || a.selected_color != b.selected_color
            || a.selected_size != b.selected_size
            || a.selected_quantity != b.selected_quantity
            || a.title != b.title
            || a.price != b.price
            || a.image != b.image
            || a.variant_id != b.variant_id
            || a.event_details != b.event_details
    })
}

/// Persists the live cart on every real change
pub struct CartAdapter {
    cache: CartCache,
    clock: SharedClock,
    /// Last snapshot that reached storage
    last_persisted: Mutex<Vec<OfflineCartItem>>,
}

impl CartAdapter {
    pub fn new(engine: &SyncEngine) -> Self {
        Self::from_parts(engine.cart_cache().clone(), engine.clock().clone())
    }

    pub fn from_parts(cache: CartCache, clock: SharedClock) -> Self {
        let last_persisted = cache.load();
        Self {
            cache,
            clock,
            last_persisted: Mutex::new(last_persisted),
        }
    }

    /// The cached cart as app state (empty when nothing fresh is cached)
    pub fn restore(&self) -> CartState {
        let items = self.cache.load();
        let state = to_cart_state(&items);
        *self.last_persisted.lock() = items;
        debug!(lines = state.lines.len(), "Cart restored from cache");
        state
    }

    /// Persist `state` if it differs from the last persisted snapshot.
    ///
    /// Returns whether a write happened and succeeded.
    pub fn on_state_change(&self, state: &CartState) -> bool {
        let mut last = self.last_persisted.lock();
        let next = to_offline_items(state, &last, self.clock.now());
        if !cart_changed(&last, &next) {
            return false;
        }

        if self.cache.save(&next) {
            debug!(lines = next.len(), "Cart persisted");
            *last = next;
            true
        } else {
            false
        }
    }

    /// Follow `live` and persist each change until the sender goes away.
    ///
    /// The value current at attach time is taken as already seen; call
    /// [`restore`](Self::restore) first to seed the app state from the cache.
    pub fn attach(self: &Arc<Self>, mut live: watch::Receiver<CartState>) -> JoinHandle<()> {
        let adapter = self.clone();
        live.borrow_and_update();
        tokio::spawn(async move {
            while live.changed().await.is_ok() {
                let state = live.borrow_and_update().clone();
                adapter.on_state_change(&state);
            }
            debug!("Cart state channel closed");
        })
    }

    /// Sync callback that re-persists the latest snapshot.
    ///
    /// Cart contents are local-only, so this only refreshes `cachedAt`.
    pub fn sync_callback(self: &Arc<Self>) -> SyncCallback {
        let adapter = self.clone();
        Arc::new(move || {
            let adapter = adapter.clone();
            async move {
                let items = adapter.last_persisted.lock().clone();
                if !items.is_empty() && !adapter.cache.save(&items) {
                    warn!("Cart refresh during sync did not persist");
                }
                Ok(())
            }
            .boxed()
        })
    }
}
