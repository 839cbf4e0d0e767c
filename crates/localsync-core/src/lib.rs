//! localsync Core Library
//!
//! Offline-first local data cache and synchronization engine for a consumer
//! mobile app.
//!
//! ## Overview
//!
//! The app keeps working without connectivity: the cart, the signed-in
//! profile and recently viewed products are served from a local redb store,
//! and remote mutations made offline are queued. When connectivity returns,
//! the engine runs every registered sync callback and then drains the queue.
//!
//! ## Core Principles
//!
//! - **Local-first**: every read can be answered from the device
//! - **Degrade, don't fail**: corrupt or unreadable caches behave as cold caches
//! - **At-least-once**: queued operations are retried up to a ceiling, then
//!   moved to a dead-letter log
//!
//! ## Quick Start
//!
//! ```ignore
//! use localsync_core::{operation_processor, sync_callback, EngineConfig, SyncEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = SyncEngine::open("~/.localsync/data", EngineConfig::default())?;
//!
//!     engine.set_operation_processor(operation_processor(|op| async move {
//!         backend::send(op).await
//!     }));
//!
//!     let (signal_tx, signal_rx) = tokio::sync::mpsc::unbounded_channel();
//!     engine.init(signal_rx)?;
//!
//!     // Platform reachability callback
//!     signal_tx.send(true)?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod queue;
pub mod storage;
pub mod sync;
pub mod types;

// Re-exports
pub use adapters::{
    cart_changed, CartAdapter, CartLine, CartState, Delivery, ProductAdapter, ProductSource,
    ProductView, ProfileAdapter,
};
pub use cache::{CartCache, ProductCache, ProfileCache};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::EngineConfig;
pub use connectivity::{ConnectivityMonitor, Transition};
pub use engine::{SyncEngine, DATABASE_FILE};
pub use error::{SyncError, SyncResult};
pub use queue::{
    DeadLetter, DeadLetterLog, DrainReport, OfflineOperation, OfflineQueue, OperationKind,
    ProfileUpdate,
};
pub use storage::{KeyValueStore, MemoryStore, SharedStore, Storage};
pub use sync::callbacks::{operation_processor, sync_callback};
pub use sync::{OperationProcessor, SyncCallback, SyncEvent, SyncReport, SyncStatus};
pub use types::*;
