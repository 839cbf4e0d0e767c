//! End-to-end offline/online scenarios
//!
//! Drives a full engine (caches, queue, adapters, connectivity listener)
//! through offline periods and reconnections and checks what ends up in
//! storage and what reaches the "backend".

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use localsync_core::{
    operation_processor, sync_callback, CartAdapter, CartLine, CartState, Delivery,
    EngineConfig, ManualClock, MemoryStore, Money, OfflineOperation, OperationKind,
    ProfileAdapter, ProfileUpdate, SyncEngine, SyncEvent, SyncReport, SyncStatus, UserProfile,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, Notify};

// ============================================================================
// Test Utilities
// ============================================================================

fn create_engine() -> Arc<SyncEngine> {
    Arc::new(SyncEngine::with_clock(
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::starting_now()),
        EngineConfig::default(),
    ))
}

fn line(product_id: &str, quantity: u32) -> CartLine {
    CartLine {
        product_id: product_id.to_string(),
        variant_id: None,
        title: format!("Ticket {}", product_id),
        price: Money::new("45.00", "GBP"),
        color: None,
        size: Some("GA".to_string()),
        quantity,
        image: None,
        event: None,
    }
}

/// Processor that records every delivered operation
fn recording_processor(engine: &SyncEngine) -> Arc<Mutex<Vec<OfflineOperation>>> {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();
    engine.set_operation_processor(operation_processor(move |op| {
        let sink = sink.clone();
        async move {
            sink.lock().push(op);
            Ok(())
        }
    }));
    delivered
}

fn counting_callback(engine: &SyncEngine, name: &str) -> Arc<AtomicUsize> {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    engine.register_sync_callback(
        name,
        sync_callback(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
    );
    runs
}

/// Wait for the next SyncCompleted event
async fn next_sync(events: &mut broadcast::Receiver<SyncEvent>) -> SyncReport {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::SyncCompleted(report)) => return report,
                Ok(_) => continue,
                Err(e) => panic!("event channel failed: {}", e),
            }
        }
    })
    .await
    .expect("sync pass did not complete")
}

// ============================================================================
// Offline -> Online
// ============================================================================

/// Offline cart edits and a queued profile change survive until reconnection,
/// then the queue drains and the cart is intact.
#[tokio::test]
async fn test_offline_cart_then_reconnect() {
    let engine = create_engine();
    let delivered = recording_processor(&engine);
    let cart = CartAdapter::new(&engine);
    let profile = ProfileAdapter::new(&engine);

    assert!(!engine.is_online());
    profile.persist(&UserProfile::new("u1", "Ana"));

    cart.on_state_change(&CartState {
        lines: vec![line("A", 1)],
    });
    cart.on_state_change(&CartState {
        lines: vec![line("A", 1), line("B", 2)],
    });

    let delivery = profile.apply_update(
        "u1",
        ProfileUpdate {
            bio: Some("offline edit".to_string()),
            ..Default::default()
        },
    );
    assert!(matches!(delivery, Delivery::Queued(_)));
    engine
        .queue()
        .enqueue(OperationKind::LikePost {
            post_id: "post-9".to_string(),
        })
        .unwrap();
    assert_eq!(engine.queue().len(), 2);

    let report = engine.observe(true).await.expect("reconnection runs a pass");

    assert_eq!(engine.cart_cache().load().len(), 2);
    assert!(engine.queue().is_empty());
    assert_eq!(report.drain.as_ref().unwrap().delivered, 2);

    let kinds: Vec<&str> = delivered.lock().iter().map(|op| op.type_name()).collect();
    assert_eq!(kinds, vec!["update_profile", "like_post"]);
    assert_eq!(profile.load("u1").unwrap().bio, "offline edit");
    assert_eq!(engine.status(), SyncStatus::Idle);
}

/// One false->true transition runs each callback once and drains once;
/// a repeated `true` does nothing.
#[tokio::test]
async fn test_single_pass_per_reconnection() {
    let engine = create_engine();
    let first = counting_callback(&engine, "first");
    let second = counting_callback(&engine, "second");
    let delivered = recording_processor(&engine);
    engine
        .queue()
        .enqueue(OperationKind::FollowUser {
            user_id: "u7".to_string(),
        })
        .unwrap();

    let mut events = engine.subscribe();
    let (tx, rx) = mpsc::unbounded_channel();
    engine.init(rx).unwrap();

    tx.send(false).unwrap();
    tx.send(true).unwrap();
    let report = next_sync(&mut events).await;
    assert_eq!(report.callbacks_run, 2);

    tx.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert_eq!(delivered.lock().len(), 1);
    assert!(engine.last_sync().is_some());
}

/// Going offline never triggers a pass
#[tokio::test]
async fn test_disconnect_does_not_sync() {
    let engine = create_engine();
    let runs = counting_callback(&engine, "count");

    engine.observe(true).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    assert!(engine.observe(false).await.is_none());
    assert!(!engine.is_online());
    assert!(engine.network_status().last_disconnected.is_some());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Failure Isolation
// ============================================================================

/// A failing and a panicking callback do not stop the others or the drain
#[tokio::test]
async fn test_callback_failures_are_isolated() {
    let engine = create_engine();
    let healthy = counting_callback(&engine, "healthy");
    engine.register_sync_callback(
        "failing",
        sync_callback(|| async { anyhow::bail!("timeout talking to backend") }),
    );
    engine.register_sync_callback(
        "panicking",
        sync_callback(|| async {
            panic!("bug in callback");
        }),
    );
    let delivered = recording_processor(&engine);
    engine
        .queue()
        .enqueue(OperationKind::UnlikePost {
            post_id: "p3".to_string(),
        })
        .unwrap();

    let report = engine.observe(true).await.unwrap();

    assert_eq!(healthy.load(Ordering::SeqCst), 1);
    assert_eq!(report.callbacks_run, 3);
    let mut failed = report.callbacks_failed.clone();
    failed.sort();
    assert_eq!(failed, vec!["failing".to_string(), "panicking".to_string()]);
    assert_eq!(delivered.lock().len(), 1);
    assert!(!report.is_clean());
    assert_eq!(engine.status(), SyncStatus::Idle);
}

/// An always-failing operation is retried on three passes, then moved to the
/// dead-letter log and announced.
#[tokio::test]
async fn test_retry_ceiling_reaches_dead_letters() {
    let engine = create_engine();
    engine.set_operation_processor(operation_processor(|_op| async {
        anyhow::bail!("422 Unprocessable Entity")
    }));
    engine
        .queue()
        .enqueue(OperationKind::AddComment {
            post_id: "p1".to_string(),
            text: "great set".to_string(),
        })
        .unwrap();
    let mut events = engine.subscribe();

    engine.observe(true).await.unwrap();
    assert_eq!(engine.queue().pending()[0].retry_count, 1);
    engine.sync_now().await.unwrap();
    assert_eq!(engine.queue().pending()[0].retry_count, 2);
    let report = engine.sync_now().await.unwrap();

    assert!(engine.queue().is_empty());
    assert_eq!(report.drain.unwrap().abandoned.len(), 1);

    let dead = engine.dead_letters().list();
    assert_eq!(dead.len(), 1);
    assert_eq!(
        dead[0].operation.last_error.as_deref(),
        Some("422 Unprocessable Entity")
    );

    let mut abandoned_events = 0;
    while let Ok(event) = events.try_recv() {
        if let SyncEvent::OperationAbandoned(op) = event {
            assert_eq!(op.type_name(), "add_comment");
            abandoned_events += 1;
        }
    }
    assert_eq!(abandoned_events, 1);

    // Fourth pass has nothing left to attempt
    let report = engine.sync_now().await.unwrap();
    assert_eq!(report.drain.unwrap().attempted, 0);
}

// ============================================================================
// Flapping
// ============================================================================

/// Reconnections during a running pass collapse into exactly one extra pass
#[tokio::test]
async fn test_flapping_during_pass_coalesces() {
    let engine = create_engine();
    let runs = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    {
        let runs = runs.clone();
        let started = started.clone();
        let gate = gate.clone();
        engine.register_sync_callback(
            "slow",
            sync_callback(move || {
                let runs = runs.clone();
                let started = started.clone();
                let gate = gate.clone();
                async move {
                    if runs.fetch_add(1, Ordering::SeqCst) == 0 {
                        started.notify_one();
                        gate.notified().await;
                    }
                    Ok(())
                }
            }),
        );
    }

    let first_pass = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.observe(true).await })
    };
    started.notified().await;
    assert_eq!(engine.status(), SyncStatus::Syncing);

    for _ in 0..3 {
        assert!(engine.observe(false).await.is_none());
        assert!(engine.observe(true).await.is_none());
    }

    gate.notify_one();
    let report = first_pass.await.unwrap();

    assert!(report.is_some());
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(engine.status(), SyncStatus::Idle);
}

/// Observations already buffered when the listener wakes yield one pass
#[tokio::test]
async fn test_buffered_flaps_yield_one_pass() {
    let engine = create_engine();
    let runs = counting_callback(&engine, "count");
    let mut events = engine.subscribe();

    let (tx, rx) = mpsc::unbounded_channel();
    engine.init(rx).unwrap();
    for observation in [true, false, true, false, true, true] {
        tx.send(observation).unwrap();
    }

    next_sync(&mut events).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(engine.is_online());
}

/// A burst that ends offline does not sync
#[tokio::test]
async fn test_buffered_flaps_ending_offline_skip_pass() {
    let engine = create_engine();
    let runs = counting_callback(&engine, "count");

    let (tx, rx) = mpsc::unbounded_channel();
    engine.init(rx).unwrap();
    for observation in [true, false] {
        tx.send(observation).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(!engine.is_online());
    assert!(engine.last_sync().is_none());
}

// ============================================================================
// Lifecycle
// ============================================================================

/// After dispose, reconnections no longer reach callbacks
#[tokio::test]
async fn test_dispose_stops_syncing() {
    let engine = create_engine();
    let runs = counting_callback(&engine, "count");

    let (tx, rx) = mpsc::unbounded_channel();
    engine.init(rx).unwrap();
    engine.dispose();
    assert!(!engine.is_listening());

    let _ = tx.send(true);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(engine.callback_count(), 0);
}
