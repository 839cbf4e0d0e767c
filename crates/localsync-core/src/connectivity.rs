//! Connectivity monitor
//!
//! Turns a stream of raw reachability observations into discrete
//! transitions. Only a change of `is_connected` between two consecutive
//! observations is a transition; repeated identical reports are ignored.
//! There is no polling and no debounce here: a flapping signal produces
//! flapping transitions, and coalescing is left to the sync engine.

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::cache::load_or_empty;
use crate::clock::SharedClock;
use crate::storage::{keys, write_json, SharedStore};
use crate::types::ConnectivityState;

/// A change in connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Online to offline
    WentOffline,
    /// Offline to online
    Reconnected,
}

/// Tracks the last known connectivity state and persists it on change.
///
/// Before any state is known (nothing persisted, nothing observed) the
/// device counts as offline, so the first online observation is a
/// reconnection.
pub struct ConnectivityMonitor {
    store: SharedStore,
    clock: SharedClock,
    state: RwLock<ConnectivityState>,
}

impl ConnectivityMonitor {
    /// Create a monitor, restoring the last persisted state if there is one
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        let state: ConnectivityState =
            load_or_empty(store.as_ref(), keys::CONNECTIVITY).unwrap_or_default();
        debug!(is_connected = state.is_connected, "Restored connectivity state");
        Self {
            store,
            clock,
            state: RwLock::new(state),
        }
    }

    /// Record an observation.
    ///
    /// Returns the transition it caused, or `None` when the report matches
    /// the current state.
    pub fn observe(&self, is_connected: bool) -> Option<Transition> {
        let snapshot = {
            let mut state = self.state.write();
            if state.is_connected == is_connected {
                return None;
            }

            let now = self.clock.now();
            state.is_connected = is_connected;
            if is_connected {
                state.last_connected = Some(now);
            } else {
                state.last_disconnected = Some(now);
            }
            state.clone()
        };

        if let Err(e) = write_json(self.store.as_ref(), keys::CONNECTIVITY, &snapshot) {
            warn!(error = %e, "Failed to persist connectivity state");
        }

        if is_connected {
            info!("Connectivity restored");
            Some(Transition::Reconnected)
        } else {
            info!("Connectivity lost");
            Some(Transition::WentOffline)
        }
    }

    pub fn is_online(&self) -> bool {
        self.state.read().is_connected
    }

    /// Current state including transition timestamps
    pub fn status(&self) -> ConnectivityState {
        self.state.read().clone()
    }
}
