//! Offline operation queue
//!
//! An append-ordered, durable log of remote mutations made while offline.
//!
//! ## Delivery semantics
//!
//! Delivery is at-least-once with a bounded retry ceiling:
//!
//! - A drain runs only if the device is online when it starts.
//! - Entries are processed oldest first, one at a time.
//! - A failed entry gains a retry; once `retry_count >= max_retries` it is
//!   removed and written to the dead-letter log instead of being retried.
//! - The queue is rewritten after the whole pass. If the process dies after
//!   a remote call succeeded but before the rewrite, that operation is
//!   delivered again on the next drain, so every processor must tolerate
//!   duplicates.
//! - Entries enqueued while a drain is running are kept and picked up by the
//!   next drain.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::clock::SharedClock;
use crate::connectivity::ConnectivityMonitor;
use crate::error::SyncError;
use crate::storage::{keys, read_json, write_json, SharedStore};

mod dead_letter;
mod operation;

pub use dead_letter::{DeadLetter, DeadLetterLog};
pub use operation::{OfflineOperation, OperationKind, ProfileUpdate};

/// Outcome of one drain pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// The drain did not run because the device was offline
    pub skipped_offline: bool,
    /// Entries handed to the processor
    pub attempted: usize,
    /// Entries delivered and removed
    pub delivered: usize,
    /// Entries that failed and stay queued for another attempt
    pub retried: usize,
    /// Entries that failed their last attempt and were removed
    pub abandoned: Vec<OfflineOperation>,
    /// Queue length after the pass
    pub remaining: usize,
    /// Whether the rewritten queue reached storage
    pub persisted: bool,
}

impl DrainReport {
    fn skipped() -> Self {
        Self {
            skipped_offline: true,
            persisted: true,
            ..Default::default()
        }
    }
}

/// Durable FIFO of [`OfflineOperation`]s
pub struct OfflineQueue {
    store: SharedStore,
    clock: SharedClock,
    connectivity: Arc<ConnectivityMonitor>,
    dead_letters: DeadLetterLog,
    default_max_retries: u32,
    /// Serializes read-modify-write cycles on the queue key
    write_lock: Mutex<()>,
}

impl OfflineQueue {
    pub fn new(
        store: SharedStore,
        clock: SharedClock,
        connectivity: Arc<ConnectivityMonitor>,
        dead_letters: DeadLetterLog,
        default_max_retries: u32,
    ) -> Self {
        Self {
            store,
            clock,
            connectivity,
            dead_letters,
            default_max_retries,
            write_lock: Mutex::new(()),
        }
    }

    /// Read the persisted queue.
    ///
    /// Unreadable storage is an error (writing back would wipe the queue);
    /// a corrupt value is logged and treated as an empty queue.
    fn read_queue(&self) -> Result<Vec<OfflineOperation>, SyncError> {
        match read_json(self.store.as_ref(), keys::QUEUE) {
            Ok(queue) => Ok(queue.unwrap_or_default()),
            Err(SyncError::Serialization(e)) => {
                warn!(error = %e, "Offline queue is corrupt, starting from an empty queue");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Append an operation with the default retry ceiling
    pub fn enqueue(&self, operation: OperationKind) -> Result<OfflineOperation, SyncError> {
        self.enqueue_with_retries(operation, self.default_max_retries)
    }

    /// Append an operation. Returns once the entry is persisted.
    pub fn enqueue_with_retries(
        &self,
        operation: OperationKind,
        max_retries: u32,
    ) -> Result<OfflineOperation, SyncError> {
        let entry = OfflineOperation::new(operation, max_retries, self.clock.now());

        let _guard = self.write_lock.lock();
        let mut queue = self.read_queue()?;
        queue.push(entry.clone());
        write_json(self.store.as_ref(), keys::QUEUE, &queue)?;

        info!(id = %entry.id, kind = entry.type_name(), queued = queue.len(), "Operation queued");
        Ok(entry)
    }

    /// Pending operations, oldest first. Unreadable storage reads as empty.
    pub fn pending(&self) -> Vec<OfflineOperation> {
        match self.read_queue() {
            Ok(queue) => queue,
            Err(e) => {
                warn!(error = %e, "Failed to read offline queue");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove one pending operation by id
    pub fn remove(&self, id: &str) -> Result<bool, SyncError> {
        let _guard = self.write_lock.lock();
        let mut queue = self.read_queue()?;
        let before = queue.len();
        queue.retain(|op| op.id != id);
        if queue.len() == before {
            return Ok(false);
        }
        write_json(self.store.as_ref(), keys::QUEUE, &queue)?;
        Ok(true)
    }

    /// Drop every pending operation
    pub fn clear(&self) -> Result<(), SyncError> {
        let _guard = self.write_lock.lock();
        self.store.remove(keys::QUEUE)
    }

    pub fn dead_letters(&self) -> &DeadLetterLog {
        &self.dead_letters
    }

    /// Deliver pending operations through `process`.
    ///
    /// `process` receives each entry oldest first and must be idempotent; see
    /// the module docs. Failures never abort the pass. The returned report is
    /// informational; storage problems are logged, not returned.
    pub async fn drain<F, Fut>(&self, process: F) -> DrainReport
    where
        F: Fn(OfflineOperation) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        if !self.connectivity.is_online() {
            debug!("Offline, skipping queue drain");
            return DrainReport::skipped();
        }

        let pending = self.pending();
        if pending.is_empty() {
            return DrainReport {
                persisted: true,
                ..Default::default()
            };
        }

        info!(count = pending.len(), "Draining offline queue");

        let mut report = DrainReport {
            attempted: pending.len(),
            ..Default::default()
        };
        let mut delivered: HashSet<String> = HashSet::new();
        let mut retried: HashMap<String, OfflineOperation> = HashMap::new();

        for mut entry in pending {
            match process(entry.clone()).await {
                Ok(()) => {
                    debug!(id = %entry.id, kind = entry.type_name(), "Operation delivered");
                    delivered.insert(entry.id);
                }
                Err(e) => {
                    entry.record_failure(format!("{:#}", e));
                    if entry.is_exhausted() {
                        warn!(
                            id = %entry.id,
                            kind = entry.type_name(),
                            attempts = entry.retry_count,
                            error = %e,
                            "Operation abandoned after final retry"
                        );
                        report.abandoned.push(entry);
                    } else {
                        debug!(
                            id = %entry.id,
                            attempt = entry.retry_count,
                            max = entry.max_retries,
                            error = %e,
                            "Operation failed, will retry"
                        );
                        retried.insert(entry.id.clone(), entry);
                    }
                }
            }
        }

        report.delivered = delivered.len();
        report.retried = retried.len();

        let abandoned: HashSet<&str> = report.abandoned.iter().map(|op| op.id.as_str()).collect();

        {
            let _guard = self.write_lock.lock();
            match self.read_queue() {
                Ok(current) => {
                    // Re-read so entries enqueued during the pass survive the rewrite.
                    let next: Vec<OfflineOperation> = current
                        .into_iter()
                        .filter(|op| {
                            !delivered.contains(&op.id) && !abandoned.contains(op.id.as_str())
                        })
                        .map(|op| retried.remove(&op.id).unwrap_or(op))
                        .collect();

                    report.remaining = next.len();
                    let written = if next.is_empty() {
                        self.store.remove(keys::QUEUE)
                    } else {
                        write_json(self.store.as_ref(), keys::QUEUE, &next)
                    };
                    match written {
                        Ok(()) => report.persisted = true,
                        Err(e) => error!(error = %e, "Failed to rewrite offline queue after drain"),
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to re-read offline queue after drain");
                }
            }
        }

        // Abandoned entries stay queued when the rewrite failed and will be
        // abandoned again on a later pass.
        if report.persisted {
            self.dead_letters.record(&report.abandoned);
        }

        info!(
            delivered = report.delivered,
            retried = report.retried,
            abandoned = report.abandoned.len(),
            remaining = report.remaining,
            "Queue drain finished"
        );
        report
    }
}
