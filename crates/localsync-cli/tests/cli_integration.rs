//! CLI Integration Tests
//!
//! These tests run the `localsync` binary against a temporary data
//! directory, seeding it through localsync-core where needed.

use assert_cmd::Command;
use localsync_core::{
    EngineConfig, Money, OfflineCartItem, OperationKind, Product, SyncEngine, UserProfile,
};
use predicates::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a CLI command with a temporary data directory
fn cli_cmd(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("localsync").expect("Failed to find localsync binary");
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd
}

/// Open the engine on `data_dir`, run `seed`, and close it again
fn seed(data_dir: &TempDir, seed: impl FnOnce(&SyncEngine)) {
    let engine = SyncEngine::open(data_dir.path(), EngineConfig::default()).unwrap();
    seed(&engine);
}

fn cart_item(product_id: &str, quantity: u32) -> OfflineCartItem {
    OfflineCartItem {
        product_id: product_id.to_string(),
        title: format!("Festival Pass {}", product_id),
        price: Money::new("89.00", "USD"),
        selected_color: "black".to_string(),
        selected_size: "L".to_string(),
        selected_quantity: quantity,
        image: None,
        variant_id: None,
        event_details: None,
        added_at: chrono::Utc::now(),
    }
}

// ============================================================================
// Status Command Tests
// ============================================================================

#[test]
fn test_status_on_empty_directory() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("State: offline"))
        .stdout(predicate::str::contains("Last sync: never"))
        .stdout(predicate::str::contains("Pending operations: 0"))
        .stdout(predicate::str::contains("Data directory:"));
}

#[test]
fn test_status_reports_seeded_data() {
    let data_dir = TempDir::new().unwrap();
    seed(&data_dir, |engine| {
        engine.cart_cache().save(&[cart_item("A", 2)]);
        engine.profile_cache().save(&UserProfile::new("u1", "Ana"));
        engine
            .queue()
            .enqueue(OperationKind::LikePost {
                post_id: "p1".to_string(),
            })
            .unwrap();
    });

    cli_cmd(&data_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cart items: 2"))
        .stdout(predicate::str::contains("Profile: Ana (u1)"))
        .stdout(predicate::str::contains("Pending operations: 1"));
}

#[test]
fn test_config_file_is_loaded() {
    let data_dir = TempDir::new().unwrap();
    let config_path = data_dir.path().join("config.json");
    std::fs::write(&config_path, r#"{ "max_cached_products": 5 }"#).unwrap();

    cli_cmd(&data_dir)
        .arg("--config")
        .arg(&config_path)
        .arg("status")
        .assert()
        .success();
}

#[test]
fn test_missing_config_file_fails() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["--config", "/nonexistent/localsync.json", "status"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_age_fails() {
    let data_dir = TempDir::new().unwrap();
    let config_path = data_dir.path().join("config.json");
    std::fs::write(&config_path, r#"{ "cart_max_age_secs": -1 }"#).unwrap();

    cli_cmd(&data_dir)
        .arg("--config")
        .arg(&config_path)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cart_max_age_secs"));
}

// ============================================================================
// Cart Command Tests
// ============================================================================

#[test]
fn test_cart_show_and_clear() {
    let data_dir = TempDir::new().unwrap();
    seed(&data_dir, |engine| {
        engine.cart_cache().save(&[cart_item("A", 1), cart_item("B", 3)]);
    });

    cli_cmd(&data_dir)
        .args(["cart", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cart (4 items)"))
        .stdout(predicate::str::contains("Festival Pass B"));

    cli_cmd(&data_dir)
        .args(["cart", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cart cache cleared"));

    cli_cmd(&data_dir)
        .args(["cart", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cart is empty"));
}

#[test]
fn test_cart_show_json() {
    let data_dir = TempDir::new().unwrap();
    seed(&data_dir, |engine| {
        engine.cart_cache().save(&[cart_item("A", 1)]);
    });

    cli_cmd(&data_dir)
        .args(["cart", "show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"productId\": \"A\""))
        .stdout(predicate::str::contains("\"selectedQuantity\": 1"));
}

// ============================================================================
// Profile & Product Command Tests
// ============================================================================

#[test]
fn test_profile_show() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached profile"));

    seed(&data_dir, |engine| {
        let mut profile = UserProfile::new("u42", "Rui");
        profile.email = Some("rui@example.com".to_string());
        engine.profile_cache().save(&profile);
    });

    cli_cmd(&data_dir)
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UID: u42"))
        .stdout(predicate::str::contains("Email: rui@example.com"));
}

#[test]
fn test_products_recent_respects_limit() {
    let data_dir = TempDir::new().unwrap();
    seed(&data_dir, |engine| {
        for id in ["p1", "p2", "p3"] {
            engine
                .product_cache()
                .save(&Product::new(id, format!("Vinyl {}", id), Money::new("20.00", "USD")));
        }
    });

    cli_cmd(&data_dir)
        .args(["products", "recent", "--limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vinyl p3"))
        .stdout(predicate::str::contains("Vinyl p2"))
        .stdout(predicate::str::contains("Vinyl p1").not());
}

// ============================================================================
// Queue Command Tests
// ============================================================================

#[test]
fn test_queue_list_remove_clear() {
    let data_dir = TempDir::new().unwrap();
    let mut ids = Vec::new();
    seed(&data_dir, |engine| {
        for post_id in ["p1", "p2"] {
            let op = engine
                .queue()
                .enqueue(OperationKind::LikePost {
                    post_id: post_id.to_string(),
                })
                .unwrap();
            ids.push(op.id);
        }
    });

    cli_cmd(&data_dir)
        .args(["queue", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending operations (2)"))
        .stdout(predicate::str::contains("like_post"));

    cli_cmd(&data_dir)
        .args(["queue", "remove", ids[0].as_str()])
        .assert()
        .success();

    cli_cmd(&data_dir)
        .args(["queue", "remove", ids[0].as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No pending operation"));

    cli_cmd(&data_dir)
        .args(["queue", "clear"])
        .assert()
        .success();

    cli_cmd(&data_dir)
        .args(["queue", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Queue is empty"));
}

#[test]
fn test_dead_letters_empty() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["dead-letters", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No dead letters"));
}

// ============================================================================
// Network Command Tests
// ============================================================================

#[test]
fn test_network_online_runs_sync_pass() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["network", "online"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync pass ran 0 callbacks"));

    cli_cmd(&data_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("State: online"))
        .stdout(predicate::str::contains("Last sync: never").not());

    cli_cmd(&data_dir)
        .args(["network", "offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Now offline"));
}
