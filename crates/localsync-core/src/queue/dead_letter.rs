//! Dead-letter log for operations abandoned after their last retry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::OfflineOperation;
use crate::cache::load_or_empty;
use crate::clock::SharedClock;
use crate::storage::{keys, write_json, SharedStore};

/// An abandoned operation and when it was given up on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub operation: OfflineOperation,
    pub abandoned_at: DateTime<Utc>,
}

/// Bounded, newest-last list of abandoned operations
#[derive(Clone)]
pub struct DeadLetterLog {
    store: SharedStore,
    clock: SharedClock,
    max_entries: usize,
}

impl DeadLetterLog {
    pub fn new(store: SharedStore, clock: SharedClock, max_entries: usize) -> Self {
        Self {
            store,
            clock,
            max_entries,
        }
    }

    /// Append abandoned operations, dropping the oldest entries beyond the cap
    pub fn record(&self, operations: &[OfflineOperation]) {
        if operations.is_empty() {
            return;
        }

        let now = self.clock.now();
        let mut entries = self.list();
        entries.extend(operations.iter().cloned().map(|operation| DeadLetter {
            operation,
            abandoned_at: now,
        }));

        if entries.len() > self.max_entries {
            let overflow = entries.len() - self.max_entries;
            warn!(overflow, "Dead-letter log full, dropping oldest entries");
            entries.drain(..overflow);
        }

        if let Err(e) = write_json(self.store.as_ref(), keys::DEAD_LETTERS, &entries) {
            error!(
                error = %e,
                count = operations.len(),
                "Failed to record abandoned operations"
            );
        }
    }

    /// Abandoned operations, oldest first
    pub fn list(&self) -> Vec<DeadLetter> {
        load_or_empty(self.store.as_ref(), keys::DEAD_LETTERS).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> bool {
        crate::cache::discard(self.store.as_ref(), keys::DEAD_LETTERS)
    }
}
