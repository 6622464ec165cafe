//! In-memory review storage.
//!
//! Thread-safe implementation of the ReviewStore trait. Both record maps sit
//! behind one lock, so a pair write is atomic.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{PairKey, Progress, QueueItem};
use crate::error::Result;
use crate::storage::{ItemVersion, ReviewStore};

#[derive(Debug, Default)]
struct Records {
    progress: HashMap<PairKey, Progress>,
    items: HashMap<PairKey, QueueItem>,
}

/// In-memory review store.
///
/// Records are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryReviewStore {
    records: RwLock<Records>,
}

impl MemoryReviewStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scheduled queue items across all learners.
    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    /// Whether no queue item is stored.
    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    /// Remove every record.
    pub fn clear(&self) {
        let mut records = self.write();
        records.progress.clear();
        records.items.clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, Records> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Records> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReviewStore for MemoryReviewStore {
    fn progress(&self, key: &PairKey) -> Result<Option<Progress>> {
        Ok(self.read().progress.get(key).cloned())
    }

    fn queue_item(&self, key: &PairKey) -> Result<Option<QueueItem>> {
        Ok(self.read().items.get(key).cloned())
    }

    fn queue_items(&self, learner_id: &str) -> Result<Vec<QueueItem>> {
        Ok(self
            .read()
            .items
            .values()
            .filter(|item| item.learner_id == learner_id)
            .cloned()
            .collect())
    }

    fn learner_progress(&self, learner_id: &str) -> Result<Vec<Progress>> {
        Ok(self
            .read()
            .progress
            .values()
            .filter(|p| p.learner_id == learner_id)
            .cloned()
            .collect())
    }

    fn save_progress(&self, progress: &Progress) -> Result<()> {
        self.write()
            .progress
            .insert(progress.key(), progress.clone());
        Ok(())
    }

    fn save_pair(
        &self,
        progress: &Progress,
        item: &QueueItem,
        expected: ItemVersion,
    ) -> Result<()> {
        let key = item.key();
        let mut records = self.write();

        if !expected.matches(records.items.get(&key)) {
            return Err(key.conflict());
        }

        records.progress.insert(key.clone(), progress.clone());
        records.items.insert(key, item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::test_review_store_contract;
    use chrono::{NaiveDate, Utc};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_memory_store_contract() {
        let store = MemoryReviewStore::new();
        test_review_store_contract(&store);
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = MemoryReviewStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_clear() {
        let store = MemoryReviewStore::new();
        let key = PairKey::new("ana", "armbar").unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        store
            .save_pair(
                &Progress::new(&key, Utc::now()),
                &QueueItem::new(&key, today, Utc::now()),
                ItemVersion::Absent,
            )
            .unwrap();
        assert_eq!(store.len(), 1);

        store.clear();

        assert!(store.is_empty());
        assert!(store.progress(&key).unwrap().is_none());
    }

    #[test]
    fn test_thread_safety() {
        let store = Arc::new(MemoryReviewStore::new());
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let mut handles = vec![];

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let key = PairKey::new("ana", format!("node-{}", i)).unwrap();
                store
                    .save_pair(
                        &Progress::new(&key, Utc::now()),
                        &QueueItem::new(&key, today, Utc::now()),
                        ItemVersion::Absent,
                    )
                    .unwrap();
                store.queue_item(&key).unwrap().unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 10);
        assert_eq!(store.queue_items("ana").unwrap().len(), 10);
    }
}
