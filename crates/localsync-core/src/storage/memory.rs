//! In-memory key-value store
//!
//! Nothing survives the process. Failure injection lets tests exercise the
//! degrade-to-default paths of the cache stores and the queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::KeyValueStore;
use crate::error::SyncError;

/// Key-value store held in a `HashMap`
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail (or succeed again)
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set`/`remove` fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    fn check(&self, flag: &AtomicBool, op: &str, key: &str) -> Result<(), SyncError> {
        if flag.load(Ordering::SeqCst) {
            return Err(SyncError::Storage(format!("injected {} failure for {}", op, key)));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        self.check(&self.fail_reads, "read", key)?;
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        self.check(&self.fail_writes, "write", key)?;
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SyncError> {
        self.check(&self.fail_writes, "remove", key)?;
        self.values.write().remove(key);
        Ok(())
    }
}
