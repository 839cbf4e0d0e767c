//! Typed, TTL-bounded cache stores over the key-value store.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  CartCache     one key, whole cart snapshot, merge-by-key adds  │
//! │  ProfileCache  one key, single profile record, 24h window       │
//! │  ProductCache  one key, ranked list capped at 50, 7 day window  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every store rewrites its whole value on each write and evicts lazily on
//! read. Storage and deserialization failures never reach the caller: they
//! are logged and the store behaves as if nothing were cached.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::storage::{read_json, write_json, KeyValueStore};

mod cart;
mod product;
mod profile;

pub use cart::CartCache;
pub use product::ProductCache;
pub use profile::ProfileCache;

/// Read `key`, degrading any failure to "not cached"
pub(crate) fn load_or_empty<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    match read_json(store, key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Cache read failed, treating as empty");
            None
        }
    }
}

/// Write `key`, returning whether the value reached storage
pub(crate) fn persist<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    match write_json(store, key, value) {
        Ok(()) => true,
        Err(e) => {
            warn!(key, error = %e, "Cache write failed, value not persisted");
            false
        }
    }
}

/// Remove `key`, returning whether the removal reached storage
pub(crate) fn discard(store: &dyn KeyValueStore, key: &str) -> bool {
    match store.remove(key) {
        Ok(()) => true,
        Err(e) => {
            warn!(key, error = %e, "Cache remove failed");
            false
        }
    }
}
