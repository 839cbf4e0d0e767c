//! Core types for localsync
//!
//! These are the persisted shapes: every struct here is serialized as
//! camelCase JSON into the key-value store.

mod cart;
mod connectivity;
mod product;
mod profile;
mod record;

pub use cart::{
    merge_item, CartItemKey, CartSnapshot, EventDetails, Money, OfflineCartItem,
    CART_SCHEMA_VERSION,
};
pub use connectivity::ConnectivityState;
pub use product::{CachedProduct, Product};
pub use profile::UserProfile;
pub use record::{is_expired, CacheRecord};
