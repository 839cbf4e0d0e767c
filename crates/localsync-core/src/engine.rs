//! Main SyncEngine - the entry point for the offline data layer
//!
//! SyncEngine owns the storage handle and wires together:
//! - Cart, profile and product caches
//! - The offline operation queue and its dead-letter log
//! - The connectivity monitor
//! - Registered sync callbacks, run on every reconnection
//!
//! # Example
//!
//! ```ignore
//! use localsync_core::{EngineConfig, SyncEngine};
//!
//! let engine = SyncEngine::open("~/.localsync/data", EngineConfig::default())?;
//!
//! let (signal_tx, signal_rx) = tokio::sync::mpsc::unbounded_channel();
//! engine.init(signal_rx)?;
//!
//! engine.register_sync_callback("profile", sync_callback(|| async { Ok(()) }));
//! engine.set_operation_processor(operation_processor(|op| async move { send(op).await }));
//!
//! // Forward reachability reports from the platform
//! signal_tx.send(true)?;
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{load_or_empty, CartCache, ProductCache, ProfileCache};
use crate::clock::{SharedClock, SystemClock};
use crate::config::EngineConfig;
use crate::connectivity::{ConnectivityMonitor, Transition};
use crate::error::SyncError;
use crate::queue::{DeadLetterLog, OfflineQueue};
use crate::storage::{keys, write_json, SharedStore, Storage};
use crate::sync::callbacks::{run_all, RegisteredCallback};
use crate::sync::{OperationProcessor, SyncCallback, SyncEvent, SyncReport, SyncStatus};
use crate::types::ConnectivityState;

/// Default capacity for event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// File name of the redb database inside the data directory
pub const DATABASE_FILE: &str = "localsync.redb";

/// State shared between the engine handle and its listener task
struct EngineInner {
    store: SharedStore,
    clock: SharedClock,
    config: EngineConfig,
    connectivity: Arc<ConnectivityMonitor>,
    queue: Arc<OfflineQueue>,
    cart: CartCache,
    profile: ProfileCache,
    products: ProductCache,
    callbacks: RwLock<Vec<RegisteredCallback>>,
    processor: RwLock<Option<OperationProcessor>>,
    status: RwLock<SyncStatus>,
    /// Set while a pass runs; at most one pass at a time
    syncing: AtomicBool,
    /// A pass was requested while one was running
    rerun: AtomicBool,
    event_tx: broadcast::Sender<SyncEvent>,
}

/// Offline-first data layer: caches, offline queue and reconnection sync
pub struct SyncEngine {
    inner: Arc<EngineInner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Create an engine over `store` using the system clock
    pub fn new(store: SharedStore, config: EngineConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Create an engine with an explicit clock
    pub fn with_clock(store: SharedStore, clock: SharedClock, config: EngineConfig) -> Self {
        let connectivity = Arc::new(ConnectivityMonitor::new(store.clone(), clock.clone()));
        let dead_letters =
            DeadLetterLog::new(store.clone(), clock.clone(), config.max_dead_letters);
        let queue = Arc::new(OfflineQueue::new(
            store.clone(),
            clock.clone(),
            connectivity.clone(),
            dead_letters,
            config.default_max_retries,
        ));

        let cart = CartCache::new(store.clone(), clock.clone(), config.cart_max_age());
        let profile = ProfileCache::new(store.clone(), clock.clone(), config.profile_max_age());
        let products = ProductCache::new(
            store.clone(),
            clock.clone(),
            config.product_max_age(),
            config.max_cached_products,
        );

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(EngineInner {
                store,
                clock,
                config,
                connectivity,
                queue,
                cart,
                profile,
                products,
                callbacks: RwLock::new(Vec::new()),
                processor: RwLock::new(None),
                status: RwLock::new(SyncStatus::Idle),
                syncing: AtomicBool::new(false),
                rerun: AtomicBool::new(false),
                event_tx,
            }),
            listener: Mutex::new(None),
        }
    }

    /// Open (or create) the redb database in `data_dir`
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Io` if the directory cannot be created.
    /// Returns `SyncError::Database` if storage initialization fails.
    pub fn open(data_dir: impl AsRef<Path>, config: EngineConfig) -> Result<Self, SyncError> {
        let data_dir = data_dir.as_ref();
        info!(?data_dir, "Opening local sync store");

        std::fs::create_dir_all(data_dir)?;
        let storage = Storage::new(data_dir.join(DATABASE_FILE))?;
        Ok(Self::new(storage.shared(), config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    pub fn clock(&self) -> &SharedClock {
        &self.inner.clock
    }

    pub fn cart_cache(&self) -> &CartCache {
        &self.inner.cart
    }

    pub fn profile_cache(&self) -> &ProfileCache {
        &self.inner.profile
    }

    pub fn product_cache(&self) -> &ProductCache {
        &self.inner.products
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.inner.queue
    }

    pub fn dead_letters(&self) -> &DeadLetterLog {
        self.inner.queue.dead_letters()
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.inner.connectivity
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Start listening to connectivity reports.
    ///
    /// Each `bool` on `signal` is one reachability observation. Reports that
    /// queue up while a pass is being scheduled are folded together, so a
    /// burst of flaps yields at most one pass.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidOperation` if the engine is already listening.
    pub fn init(&self, signal: mpsc::UnboundedReceiver<bool>) -> Result<(), SyncError> {
        let mut listener = self.listener.lock();
        if listener.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(SyncError::InvalidOperation(
                "sync engine already initialized".to_string(),
            ));
        }

        info!(
            is_online = self.inner.connectivity.is_online(),
            pending = self.inner.queue.len(),
            "Starting connectivity listener"
        );
        *listener = Some(tokio::spawn(listen(self.inner.clone(), signal)));
        Ok(())
    }

    /// Stop listening and drop every registered callback and the processor
    pub fn dispose(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
            debug!("Connectivity listener stopped");
        }
        self.inner.callbacks.write().clear();
        *self.inner.processor.write() = None;
    }

    /// Whether the connectivity listener is running
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Registration
    // ═══════════════════════════════════════════════════════════════════════

    /// Register a callback run on every sync pass.
    ///
    /// Callbacks run concurrently; one failing does not affect the others.
    pub fn register_sync_callback(&self, name: impl Into<String>, callback: SyncCallback) {
        let name = name.into();
        debug!(callback = %name, "Registered sync callback");
        self.inner
            .callbacks
            .write()
            .push(RegisteredCallback { name, callback });
    }

    /// Remove callbacks registered under `name`. Returns how many were removed.
    pub fn unregister_sync_callback(&self, name: &str) -> usize {
        let mut callbacks = self.inner.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|registered| registered.name != name);
        before - callbacks.len()
    }

    pub fn callback_count(&self) -> usize {
        self.inner.callbacks.read().len()
    }

    /// Set the processor used to drain the offline queue.
    ///
    /// Without a processor, sync passes leave the queue untouched.
    pub fn set_operation_processor(&self, processor: OperationProcessor) {
        *self.inner.processor.write() = Some(processor);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Connectivity & Sync
    // ═══════════════════════════════════════════════════════════════════════

    /// Feed one connectivity observation and, on reconnection, run a pass
    /// before returning.
    ///
    /// Returns the report if this call ran the pass; `None` when there was
    /// no reconnection or a running pass absorbed the request.
    pub async fn observe(&self, is_connected: bool) -> Option<SyncReport> {
        if self.inner.apply_observation(is_connected) {
            self.inner.clone().reconcile().await
        } else {
            None
        }
    }

    /// Run a sync pass now, regardless of transitions.
    ///
    /// Returns `None` if a pass is already running; that pass will run once
    /// more after it finishes.
    pub async fn sync_now(&self) -> Option<SyncReport> {
        self.inner.clone().reconcile().await
    }

    pub fn is_online(&self) -> bool {
        self.inner.connectivity.is_online()
    }

    /// Current connectivity state with transition timestamps
    pub fn network_status(&self) -> ConnectivityState {
        self.inner.connectivity.status()
    }

    pub fn status(&self) -> SyncStatus {
        *self.inner.status.read()
    }

    /// When the last sync pass finished, if ever
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        load_or_empty(self.inner.store.as_ref(), keys::LAST_SYNC)
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.event_tx.subscribe()
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.abort();
        }
    }
}

impl EngineInner {
    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn set_status(&self, status: SyncStatus) {
        let changed = {
            let mut current = self.status.write();
            let changed = *current != status;
            *current = status;
            changed
        };
        if changed {
            self.emit(SyncEvent::StatusChanged(status));
        }
    }

    /// Apply one observation. Returns true on reconnection.
    fn apply_observation(&self, is_connected: bool) -> bool {
        match self.connectivity.observe(is_connected) {
            Some(transition) => {
                self.emit(SyncEvent::ConnectivityChanged { is_connected });
                transition == Transition::Reconnected
            }
            None => false,
        }
    }

    /// Run a pass unless one is running, in which case ask it to go again
    async fn reconcile(self: Arc<Self>) -> Option<SyncReport> {
        if self.syncing.swap(true, Ordering::SeqCst) {
            debug!("Sync already running, coalescing request");
            self.rerun.store(true, Ordering::SeqCst);
            return None;
        }

        let mut report = self.run_pass().await;
        loop {
            if self.rerun.swap(false, Ordering::SeqCst) {
                debug!("Sync requested during pass, running again");
                report = self.run_pass().await;
                continue;
            }

            self.syncing.store(false, Ordering::SeqCst);

            // A request can land between the check above and the release
            if self.rerun.swap(false, Ordering::SeqCst)
                && !self.syncing.swap(true, Ordering::SeqCst)
            {
                report = self.run_pass().await;
                continue;
            }
            break;
        }

        Some(report)
    }

    /// Callbacks, then queue drain, then last-sync timestamp
    async fn run_pass(&self) -> SyncReport {
        let started_at = self.clock.now();
        self.set_status(SyncStatus::Syncing);

        let callbacks = self.callbacks.read().clone();
        let callbacks_run = callbacks.len();
        info!(callbacks = callbacks_run, "Sync pass started");

        let mut callbacks_failed = Vec::new();
        for outcome in run_all(callbacks).await {
            if let Some(message) = outcome.error {
                self.emit(SyncEvent::CallbackFailed {
                    name: outcome.name.clone(),
                    message,
                });
                callbacks_failed.push(outcome.name);
            }
        }

        let processor = self.processor.read().clone();
        let drain = match processor {
            Some(processor) => {
                let report = self
                    .queue
                    .drain(|op| {
                        let delivery = tokio::spawn(processor(op));
                        async move {
                            delivery
                                .await
                                .map_err(|e| anyhow::anyhow!("operation processor panicked: {}", e))?
                        }
                    })
                    .await;
                for abandoned in &report.abandoned {
                    self.emit(SyncEvent::OperationAbandoned(abandoned.clone()));
                }
                Some(report)
            }
            None => {
                debug!("No operation processor set, leaving queue untouched");
                None
            }
        };

        let finished_at = self.clock.now();
        if let Err(e) = write_json(self.store.as_ref(), keys::LAST_SYNC, &finished_at) {
            warn!(error = %e, "Failed to persist last sync time");
        }

        let report = SyncReport {
            started_at,
            finished_at,
            callbacks_run,
            callbacks_failed,
            drain,
        };

        info!(
            failed = report.callbacks_failed.len(),
            delivered = report.drain.as_ref().map(|d| d.delivered).unwrap_or(0),
            remaining = report.drain.as_ref().map(|d| d.remaining).unwrap_or(0),
            "Sync pass finished"
        );

        self.set_status(SyncStatus::Idle);
        self.emit(SyncEvent::SyncCompleted(report.clone()));
        report
    }
}

/// Consume connectivity reports until the sender is dropped
async fn listen(inner: Arc<EngineInner>, mut signal: mpsc::UnboundedReceiver<bool>) {
    while let Some(first) = signal.recv().await {
        let mut reconnected = inner.apply_observation(first);
        while let Ok(next) = signal.try_recv() {
            reconnected |= inner.apply_observation(next);
        }

        if reconnected && inner.connectivity.is_online() {
            let inner = inner.clone();
            tokio::spawn(async move {
                inner.reconcile().await;
            });
        } else if reconnected {
            debug!("Reconnected and dropped again before sync, skipping pass");
        }
    }
    debug!("Connectivity signal closed");
}
