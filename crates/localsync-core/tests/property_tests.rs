//! Property-based tests for cart merging and the product list
//!
//! Uses proptest to check the invariants the caches keep regardless of the
//! order or mix of writes.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use localsync_core::{
    cart_changed, merge_item, CartItemKey, EngineConfig, ManualClock, MemoryStore, Money,
    OfflineCartItem, Product, SyncEngine,
};
use proptest::prelude::*;

// ============================================================================
// Strategy Generators
// ============================================================================

/// A cart line drawn from a small key space so merges actually happen
fn cart_item_strategy() -> impl Strategy<Value = OfflineCartItem> {
    (
        prop::sample::select(vec!["A", "B", "C"]),
        prop::sample::select(vec!["red", "blue"]),
        prop::sample::select(vec!["S", "M"]),
        1u32..5,
    )
        .prop_map(|(product_id, color, size, quantity)| OfflineCartItem {
            product_id: product_id.to_string(),
            title: format!("Item {}", product_id),
            price: Money::new("10.00", "USD"),
            selected_color: color.to_string(),
            selected_size: size.to_string(),
            selected_quantity: quantity,
            image: None,
            variant_id: None,
            event_details: None,
            added_at: Utc::now(),
        })
}

/// Product ids from a key space larger than a small cap
fn product_ids_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..20, 0..60)
}

fn create_engine(max_products: usize) -> SyncEngine {
    SyncEngine::with_clock(
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::starting_now()),
        EngineConfig::default().with_max_cached_products(max_products),
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Merging never loses quantity and never duplicates a key
    #[test]
    fn merge_preserves_quantity_and_keys(items in prop::collection::vec(cart_item_strategy(), 0..30)) {
        let mut cart = Vec::new();
        for item in items.clone() {
            merge_item(&mut cart, item);
        }

        let total_in: u32 = items.iter().map(|i| i.selected_quantity).sum();
        let total_out: u32 = cart.iter().map(|i| i.selected_quantity).sum();
        prop_assert_eq!(total_in, total_out);

        let keys: HashSet<CartItemKey> = cart.iter().map(|i| i.key()).collect();
        prop_assert_eq!(keys.len(), cart.len());
    }

    /// Adding items through the cache matches merging in memory
    #[test]
    fn cache_add_matches_merge(items in prop::collection::vec(cart_item_strategy(), 1..15)) {
        let engine = create_engine(50);
        let mut expected = Vec::new();
        for item in items {
            merge_item(&mut expected, item.clone());
            engine.cart_cache().add_item(item);
        }

        let cached = engine.cart_cache().load();
        prop_assert!(!cart_changed(&expected, &cached));
    }

    /// Saving the same cart twice is idempotent
    #[test]
    fn cart_save_is_idempotent(items in prop::collection::vec(cart_item_strategy(), 1..10)) {
        let engine = create_engine(50);
        let mut cart = Vec::new();
        for item in items {
            merge_item(&mut cart, item);
        }

        engine.cart_cache().save(&cart);
        let once = engine.cart_cache().load();
        engine.cart_cache().save(&cart);
        let twice = engine.cart_cache().load();
        prop_assert_eq!(once, twice);
    }

    /// The product list stays capped, deduplicated, and most recent first
    #[test]
    fn product_list_capped_and_deduplicated(ids in product_ids_strategy(), cap in 1usize..10) {
        let engine = create_engine(cap);
        for id in &ids {
            let id = format!("p{}", id);
            engine
                .product_cache()
                .save(&Product::new(id.clone(), id, Money::new("1.00", "USD")));
        }

        let stored = engine.product_cache().ids();
        prop_assert!(stored.len() <= cap);

        let unique: HashSet<&String> = stored.iter().collect();
        prop_assert_eq!(unique.len(), stored.len());

        if let Some(last) = ids.last() {
            prop_assert_eq!(stored[0].clone(), format!("p{}", last));
        }
    }
}
