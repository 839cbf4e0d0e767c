//! Profile adapter: caches the signed-in user's profile and queues offline edits

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info};

use crate::cache::ProfileCache;
use crate::clock::SharedClock;
use crate::connectivity::ConnectivityMonitor;
use crate::engine::SyncEngine;
use crate::queue::{OfflineOperation, OfflineQueue, OperationKind, ProfileUpdate};
use crate::sync::SyncCallback;
use crate::types::UserProfile;

/// What the caller should do with a profile edit after it is cached locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The edit changed nothing
    Unchanged,
    /// Online: the caller sends the edit to the backend itself
    SendNow,
    /// Offline: the edit is queued for the next sync pass
    Queued(OfflineOperation),
    /// Offline, and the queue could not persist the edit
    NotQueued,
}

pub struct ProfileAdapter {
    cache: ProfileCache,
    queue: Arc<OfflineQueue>,
    connectivity: Arc<ConnectivityMonitor>,
    clock: SharedClock,
}

impl ProfileAdapter {
    pub fn new(engine: &SyncEngine) -> Self {
        Self {
            cache: engine.profile_cache().clone(),
            queue: engine.queue().clone(),
            connectivity: engine.connectivity().clone(),
            clock: engine.clock().clone(),
        }
    }

    /// Cache the authenticated user's profile
    pub fn persist(&self, profile: &UserProfile) -> bool {
        self.cache.save(profile)
    }

    /// Cached profile for `uid`, if fresh
    pub fn load(&self, uid: &str) -> Option<UserProfile> {
        self.cache.load_for(uid)
    }

    /// Forget the cached profile
    pub fn sign_out(&self) -> bool {
        info!("Clearing cached profile on sign-out");
        self.cache.clear()
    }

    pub fn is_offline(&self) -> bool {
        !self.connectivity.is_online()
    }

    pub fn has_offline_data(&self) -> bool {
        self.cache.load().is_some()
    }

    /// Apply an edit to the cached profile of `uid`, then queue it when offline.
    ///
    /// The local copy is updated whether or not the device is online so the
    /// UI shows the edit immediately.
    pub fn apply_update(&self, uid: &str, update: ProfileUpdate) -> Delivery {
        if update.is_empty() {
            return Delivery::Unchanged;
        }

        if let Some(mut profile) = self.cache.load_for(uid) {
            update.apply_to(&mut profile);
            profile.last_updated = self.clock.now();
            self.cache.save(&profile);
        } else {
            debug!(uid, "No cached profile to apply edit to");
        }

        if self.connectivity.is_online() {
            return Delivery::SendNow;
        }

        match self.queue.enqueue(OperationKind::UpdateProfile(update)) {
            Ok(op) => Delivery::Queued(op),
            Err(e) => {
                error!(uid, error = %e, "Failed to queue offline profile edit");
                Delivery::NotQueued
            }
        }
    }

    /// Sync callback that refreshes the cached profile from the backend.
    ///
    /// Skipped while an offline profile edit is still queued: the drain runs
    /// after callbacks, and a refresh before it would show stale remote data.
    pub fn sync_callback<F, Fut>(self: &Arc<Self>, fetch: F) -> SyncCallback
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<UserProfile>>> + Send + 'static,
    {
        let adapter = self.clone();
        let fetch = Arc::new(fetch);
        Arc::new(move || {
            let adapter = adapter.clone();
            let fetch = fetch.clone();
            async move {
                let Some(cached) = adapter.cache.load() else {
                    return Ok(());
                };

                let edit_pending = adapter
                    .queue
                    .pending()
                    .iter()
                    .any(|op| matches!(op.operation, OperationKind::UpdateProfile(_)));
                if edit_pending {
                    debug!(uid = %cached.uid, "Profile edit queued, skipping refresh");
                    return Ok(());
                }

                if let Some(fresh) = fetch(cached.uid.clone()).await? {
                    if fresh.uid == cached.uid {
                        adapter.cache.save(&fresh);
                    }
                }
                Ok(())
            }
            .boxed()
        })
    }
}
