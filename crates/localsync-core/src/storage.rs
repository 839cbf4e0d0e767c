//! Persistent key-value storage.
//!
//! Everything localsync persists goes through the [`KeyValueStore`] trait as
//! JSON strings under a handful of fixed keys:
//! - Cart snapshot
//! - Profile cache
//! - Product cache list
//! - Offline operation queue (and its dead-letter log)
//! - Last-known connectivity state
//! - Last sync timestamp
//!
//! Two backends are provided: [`Storage`] (redb, survives restarts) and
//! [`MemoryStore`] (process-local, used by tests and ephemeral sessions).
//! No backend offers multi-key transactions; consistency between keys is
//! best-effort.

use crate::error::SyncError;
use parking_lot::RwLock;
use redb::{Database, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

mod memory;

pub use memory::MemoryStore;

/// Storage keys, one per logical value
pub mod keys {
    pub const CART: &str = "localsync/cart";
    pub const PROFILE: &str = "localsync/profile";
    pub const PRODUCTS: &str = "localsync/products";
    pub const QUEUE: &str = "localsync/queue";
    pub const DEAD_LETTERS: &str = "localsync/dead_letters";
    pub const CONNECTIVITY: &str = "localsync/connectivity";
    pub const LAST_SYNC: &str = "localsync/last_sync";

    /// All keys owned by localsync
    pub const ALL: [&str; 7] = [
        CART,
        PROFILE,
        PRODUCTS,
        QUEUE,
        DEAD_LETTERS,
        CONNECTIVITY,
        LAST_SYNC,
    ];
}

const KV_TABLE: TableDefinition<&str, &str> = TableDefinition::new("kv");

/// Durable string-keyed storage of string values.
///
/// Every method may fail and must report failure instead of pretending to
/// succeed; callers decide how to degrade.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>, SyncError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), SyncError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), SyncError>;
}

/// Shared handle to a key-value store
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Read and deserialize the JSON value under `key`.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, SyncError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize `value` as JSON and store it under `key`.
pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), SyncError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Key-value store backed by a redb database file
#[derive(Clone)]
pub struct Storage {
    db: Arc<RwLock<Database>>,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will:
    /// - Create the database directory if it doesn't exist
    /// - Initialize the database file
    /// - Create the key-value table
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(KV_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    /// Wrap this storage in a shared trait-object handle
    pub fn shared(self) -> SharedStore {
        Arc::new(self)
    }
}

impl KeyValueStore for Storage {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(KV_TABLE)?;

        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SyncError> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV_TABLE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
