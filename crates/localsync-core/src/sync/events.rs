//! Sync status and event types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  SyncStatus: engine state                                       │
//! │  ├── Idle: no pass running                                      │
//! │  └── Syncing: callbacks, then queue drain, then timestamp       │
//! │                                                                 │
//! │  SyncEvent: notifications for status indicators                 │
//! │  ├── ConnectivityChanged: a real online/offline transition      │
//! │  ├── StatusChanged: Idle <-> Syncing                            │
//! │  ├── CallbackFailed: one sync callback returned an error        │
//! │  ├── OperationAbandoned: queue entry ran out of retries         │
//! │  └── SyncCompleted: a pass finished (successfully or not)       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::{DateTime, Utc};

use crate::queue::{DrainReport, OfflineOperation};

/// State of the sync engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncStatus {
    /// No sync pass in progress
    #[default]
    Idle,
    /// A reconciliation pass is running
    Syncing,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "Idle"),
            SyncStatus::Syncing => write!(f, "Syncing"),
        }
    }
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of sync callbacks invoked
    pub callbacks_run: usize,
    /// Names of callbacks that failed or panicked
    pub callbacks_failed: Vec<String>,
    /// Queue drain outcome, `None` when no operation processor is set
    pub drain: Option<DrainReport>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.callbacks_failed.is_empty()
            && self
                .drain
                .as_ref()
                .map(|d| d.abandoned.is_empty() && d.retried == 0 && d.persisted)
                .unwrap_or(true)
    }
}

/// Events emitted by the sync engine
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Connectivity flipped
    ConnectivityChanged { is_connected: bool },
    /// Engine status changed
    StatusChanged(SyncStatus),
    /// A sync callback failed; other callbacks were unaffected
    CallbackFailed { name: String, message: String },
    /// A queued operation exhausted its retries and moved to the dead-letter log
    OperationAbandoned(OfflineOperation),
    /// A reconciliation pass finished
    SyncCompleted(SyncReport),
}
