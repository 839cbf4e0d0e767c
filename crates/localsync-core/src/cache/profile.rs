//! Profile cache - a single record for the signed-in user

use chrono::Duration;
use tracing::debug;

use super::{discard, load_or_empty, persist};
use crate::clock::SharedClock;
use crate::storage::{keys, SharedStore};
use crate::types::{CacheRecord, UserProfile};

/// Cached profile of the current user.
///
/// Only one profile is ever cached; saving a different user's profile
/// replaces it. Expired records are deleted when read.
#[derive(Clone)]
pub struct ProfileCache {
    store: SharedStore,
    clock: SharedClock,
    max_age: Duration,
}

impl ProfileCache {
    pub fn new(store: SharedStore, clock: SharedClock, max_age: Duration) -> Self {
        Self {
            store,
            clock,
            max_age,
        }
    }

    /// Cache `profile`, replacing whatever was cached before
    pub fn save(&self, profile: &UserProfile) -> bool {
        let record = CacheRecord::new(profile.clone(), self.clock.now());
        let saved = persist(self.store.as_ref(), keys::PROFILE, &record);
        if saved {
            debug!(uid = %profile.uid, "Profile cached");
        }
        saved
    }

    /// The cached record including its `cachedAt`, if still fresh
    pub fn record(&self) -> Option<CacheRecord<UserProfile>> {
        let record: CacheRecord<UserProfile> =
            load_or_empty(self.store.as_ref(), keys::PROFILE)?;

        if record.is_expired(self.clock.now(), self.max_age) {
            debug!(uid = %record.value.uid, cached_at = %record.cached_at, "Cached profile expired");
            discard(self.store.as_ref(), keys::PROFILE);
            return None;
        }

        Some(record)
    }

    /// The cached profile, if still fresh
    pub fn load(&self) -> Option<UserProfile> {
        self.record().map(CacheRecord::into_value)
    }

    /// The cached profile only if it belongs to `uid`
    pub fn load_for(&self, uid: &str) -> Option<UserProfile> {
        self.load().filter(|profile| profile.uid == uid)
    }

    /// Drop the cached profile (sign-out)
    pub fn clear(&self) -> bool {
        discard(self.store.as_ref(), keys::PROFILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn setup() -> (ProfileCache, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let cache = ProfileCache::new(store.clone(), clock.clone(), Duration::hours(24));
        (cache, store, clock)
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (cache, _store, _clock) = setup();
        let mut profile = UserProfile::new("uid-1", "Robin");
        profile.email = Some("robin@example.com".to_string());
        profile.followers_count = 12;

        assert!(cache.save(&profile));
        assert_eq!(cache.load(), Some(profile));
    }

    #[test]
    fn test_single_record_is_replaced() {
        let (cache, _store, _clock) = setup();
        cache.save(&UserProfile::new("uid-1", "Robin"));
        cache.save(&UserProfile::new("uid-2", "Sam"));

        assert!(cache.load_for("uid-1").is_none());
        assert_eq!(cache.load_for("uid-2").unwrap().display_name, "Sam");
    }

    #[test]
    fn test_expired_profile_is_deleted_on_read() {
        let (cache, store, clock) = setup();
        cache.save(&UserProfile::new("uid-1", "Robin"));

        clock.advance(Duration::hours(23));
        assert!(cache.load().is_some());

        clock.advance(Duration::hours(2));
        assert!(store.get(keys::PROFILE).unwrap().is_some());
        assert!(cache.load().is_none());
        assert!(store.get(keys::PROFILE).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_profile_reads_as_none() {
        let (cache, store, _clock) = setup();
        store.set(keys::PROFILE, "{\"uid\": 42").unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_clear() {
        let (cache, _store, _clock) = setup();
        cache.save(&UserProfile::new("uid-1", "Robin"));
        assert!(cache.clear());
        assert!(cache.load().is_none());
    }
}
