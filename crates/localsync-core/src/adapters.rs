//! Consumer adapters between app state and the persisted shapes.
//!
//! Adapters never return storage errors to the UI. They report degraded
//! state through `is_offline` / `has_offline_data` instead.

mod cart;
mod product;
mod profile;

pub use cart::{cart_changed, to_cart_state, to_offline_items, CartAdapter, CartLine, CartState};
pub use product::{ProductAdapter, ProductSource, ProductView};
pub use profile::{Delivery, ProfileAdapter};
