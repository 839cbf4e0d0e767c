//! Product cache - recently seen catalog items
//!
//! Stored as one ranked list, most recently written first, deduplicated by
//! product id and capped in length. Entries past the freshness window are
//! dropped on the next full read, and the shortened list is written back.

use chrono::Duration;
use tracing::debug;

use super::{discard, load_or_empty, persist};
use crate::clock::SharedClock;
use crate::storage::{keys, SharedStore};
use crate::types::{is_expired, CachedProduct, Product};

#[derive(Clone)]
pub struct ProductCache {
    store: SharedStore,
    clock: SharedClock,
    max_age: Duration,
    max_entries: usize,
}

impl ProductCache {
    pub fn new(store: SharedStore, clock: SharedClock, max_age: Duration, max_entries: usize) -> Self {
        Self {
            store,
            clock,
            max_age,
            max_entries,
        }
    }

    /// Read the stored list and drop expired entries, compacting storage if
    /// anything was dropped.
    fn read_fresh(&self) -> Vec<CachedProduct> {
        let stored: Vec<CachedProduct> =
            load_or_empty(self.store.as_ref(), keys::PRODUCTS).unwrap_or_default();
        let now = self.clock.now();
        let before = stored.len();

        let fresh: Vec<CachedProduct> = stored
            .into_iter()
            .filter(|entry| !is_expired(entry.cached_at, now, self.max_age))
            .collect();

        if fresh.len() != before {
            debug!(dropped = before - fresh.len(), "Purging expired cached products");
            self.write(&fresh);
        }
        fresh
    }

    fn write(&self, entries: &[CachedProduct]) -> bool {
        if entries.is_empty() {
            discard(self.store.as_ref(), keys::PRODUCTS)
        } else {
            persist(self.store.as_ref(), keys::PRODUCTS, entries)
        }
    }

    /// Cache a product and move it to the front of the list.
    ///
    /// An existing entry keeps its `viewedAt`; its data and `cachedAt` are
    /// replaced. The list is trimmed to the configured maximum.
    pub fn save(&self, product: &Product) -> bool {
        let now = self.clock.now();
        let mut entries = self.read_fresh();

        let entry = match entries.iter().position(|e| e.id() == product.id) {
            Some(index) => {
                let mut existing = entries.remove(index);
                existing.product = product.clone();
                existing.cached_at = now;
                existing
            }
            None => CachedProduct::new(product.clone(), now),
        };
        entries.insert(0, entry);
        entries.truncate(self.max_entries);

        self.write(&entries)
    }

    /// Replace the data of products that are already cached, keeping their
    /// positions and `viewedAt`. Products not in the cache are ignored.
    /// Returns how many entries were refreshed.
    pub fn refresh(&self, products: &[Product]) -> usize {
        let now = self.clock.now();
        let mut entries = self.read_fresh();
        let mut refreshed = 0;

        for entry in entries.iter_mut() {
            if let Some(product) = products.iter().find(|p| p.id == entry.product.id) {
                entry.product = product.clone();
                entry.cached_at = now;
                refreshed += 1;
            }
        }

        if refreshed > 0 {
            self.write(&entries);
        }
        refreshed
    }

    /// Mark a cached product as just displayed.
    ///
    /// Only `viewedAt` changes; the stored order is left alone. Returns
    /// `false` if the product is not cached.
    pub fn touch(&self, product_id: &str) -> bool {
        let mut entries = self.read_fresh();
        match entries.iter_mut().find(|e| e.id() == product_id) {
            Some(entry) => {
                entry.viewed_at = self.clock.now();
                self.write(&entries)
            }
            None => false,
        }
    }

    /// All fresh cached products in stored order
    pub fn read_all(&self) -> Vec<CachedProduct> {
        self.read_fresh()
    }

    /// One fresh cached product
    pub fn read_one(&self, product_id: &str) -> Option<CachedProduct> {
        self.read_fresh().into_iter().find(|e| e.id() == product_id)
    }

    /// Fresh cached products, most recently viewed first
    pub fn recently_viewed(&self, limit: usize) -> Vec<CachedProduct> {
        let mut entries = self.read_fresh();
        entries.sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at));
        entries.truncate(limit);
        entries
    }

    /// Ids of all fresh cached products
    pub fn ids(&self) -> Vec<String> {
        self.read_fresh()
            .into_iter()
            .map(|e| e.product.id)
            .collect()
    }

    pub fn remove(&self, product_id: &str) -> bool {
        let mut entries = self.read_fresh();
        let before = entries.len();
        entries.retain(|e| e.id() != product_id);
        if entries.len() == before {
            return false;
        }
        self.write(&entries)
    }

    pub fn clear(&self) -> bool {
        discard(self.store.as_ref(), keys::PRODUCTS)
    }
}
