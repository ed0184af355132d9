//! Store Module
//!
//! In-memory key-value map kept consistent with the WAL.
//!
//! ## Responsibilities
//! - Log every mutation to the WAL before applying it
//! - Serve reads from memory only
//! - Rebuild the map by replaying the WAL on startup

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::error::Result;
use crate::wal::{Operation, Record, RecoveryReport, Wal};

/// Write-through key-value store
///
/// ## Concurrency Model
///
/// - The map has its own `RwLock`, independent of the WAL lock
/// - `set`/`delete` hold the WAL lock only while appending and the map lock
///   only while mutating, never both at once
/// - Reads take the map's read lock and never touch the WAL
pub struct Store {
    /// Key → value (RwLock: many concurrent readers)
    data: RwLock<HashMap<String, String>>,

    /// Log every mutation goes through first
    wal: Arc<Wal>,
}

impl Store {
    /// Create an empty store on top of `wal`
    ///
    /// Call [`Store::recover`] before first use when the log already has data.
    pub fn new(wal: Arc<Wal>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            wal,
        }
    }

    /// Set a key-value pair
    ///
    /// Steps:
    /// 1. Append a `Set` record to the WAL
    /// 2. Insert into the map
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.wal.append(&Record::set(key, value))?;

        self.data.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Delete a key (missing keys are fine)
    ///
    /// Steps:
    /// 1. Append a `Delete` record to the WAL
    /// 2. Remove from the map
    pub fn delete(&self, key: &str) -> Result<()> {
        self.wal.append(&Record::delete(key))?;

        self.data.write().remove(key);
        Ok(())
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// All keys, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Replay the WAL into the map
    ///
    /// Merges into whatever the map already holds. Keys and values that are
    /// not valid UTF-8 are converted lossily.
    pub fn recover(&self) -> Result<RecoveryReport> {
        let (records, report) = self.wal.recover()?;

        let mut data = self.data.write();
        for record in records {
            let key = String::from_utf8_lossy(&record.key).into_owned();
            match record.op {
                Operation::Set => {
                    let value = String::from_utf8_lossy(&record.value).into_owned();
                    data.insert(key, value);
                }
                Operation::Delete => {
                    data.remove(&key);
                }
            }
        }

        info!(keys = data.len(), records = report.records_recovered, "recovered store");
        Ok(report)
    }

    /// Force a WAL flush
    pub fn commit(&self) -> Result<()> {
        self.wal.force_flush()
    }

    /// Run several operations in a row
    ///
    /// Not a transaction: each call is logged on its own, and calls made
    /// before a failure stay applied.
    pub fn batch<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Store) -> Result<()>,
    {
        f(self)
    }

    /// Close the underlying WAL (flushes pending records)
    pub fn close(&self) -> Result<()> {
        self.wal.close()
    }

    /// The underlying WAL
    pub fn wal(&self) -> &Arc<Wal> {
        &self.wal
    }
}
