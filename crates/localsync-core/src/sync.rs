//! Reconciliation plumbing shared by the engine and the adapters
//!
//! ## Overview
//!
//! On every reconnection the engine runs one pass:
//!
//! ```text
//! offline ──(reconnect)──▶ Syncing
//!                            ├── run every sync callback concurrently
//!                            │     (each failure isolated and logged)
//!                            ├── drain the offline queue
//!                            └── persist last-sync timestamp
//!                          ──▶ Idle (whatever the outcome)
//! ```
//!
//! Callbacks go first because they refresh read-side caches; the queue holds
//! write-side mutations that should land after reads are reconciled.

pub mod callbacks;
pub mod events;

pub use callbacks::{OperationProcessor, SyncCallback};
pub use events::{SyncEvent, SyncReport, SyncStatus};
