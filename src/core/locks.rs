//! Per-pair mutual exclusion.
//!
//! Mutating queue operations for the same (learner, node) pair must not
//! interleave. Each pair gets its own mutex; the table lock is only held
//! long enough to look up or insert that mutex, so different pairs never
//! wait on each other's work.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core::records::PairKey;

/// Table of per-pair locks.
#[derive(Debug, Default)]
pub struct PairLocks {
    table: Mutex<HashMap<PairKey, Arc<Mutex<()>>>>,
}

impl PairLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<T>(&self, key: &PairKey, f: impl FnOnce() -> T) -> T {
        let pair_lock = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(table.entry(key.clone()).or_default())
        };

        // Dropped after the mutex guard, on return or unwind
        let release = Release {
            locks: self,
            key,
            pair_lock: Some(pair_lock),
        };
        let _guard = release
            .pair_lock
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(|e| e.into_inner()));
        f()
    }

    /// Drop the table entry once no other caller holds or waits on it.
    fn release(&self, key: &PairKey, pair_lock: Arc<Mutex<()>>) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the table plus ours means nobody else is queued
        if Arc::strong_count(&pair_lock) == 2 {
            table.remove(key);
        }
    }

    /// Number of pairs currently tracked.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no pair is currently tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases a pair's table entry when dropped.
struct Release<'a> {
    locks: &'a PairLocks,
    key: &'a PairKey,
    pair_lock: Option<Arc<Mutex<()>>>,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        if let Some(pair_lock) = self.pair_lock.take() {
            self.locks.release(self.key, pair_lock);
        }
    }
}
