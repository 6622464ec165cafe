//! Persistence port for review records.
//!
//! This module defines the `ReviewStore` trait. The queue manager only talks
//! to storage through it, so the scheduling logic stays testable without a
//! database.

use std::sync::Arc;

use crate::core::{PairKey, Progress, QueueItem};
use crate::error::Result;

/// Expected state of the stored queue item for an optimistic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemVersion {
    /// No queue item may exist yet.
    Absent,
    /// The stored item must carry exactly this version.
    Exactly(u64),
}

impl ItemVersion {
    /// Whether a stored item satisfies this expectation.
    pub fn matches(self, stored: Option<&QueueItem>) -> bool {
        match (self, stored) {
            (Self::Absent, None) => true,
            (Self::Exactly(v), Some(item)) => item.version == v,
            _ => false,
        }
    }
}

/// Trait for review record storage backends.
///
/// Records are keyed by (learner, node). Implementations must make
/// [`save_pair`](ReviewStore::save_pair) atomic: either both records are
/// written or neither is.
pub trait ReviewStore: Send + Sync {
    /// Retrieve progress for a pair.
    ///
    /// Returns `Ok(None)` if no progress exists.
    fn progress(&self, key: &PairKey) -> Result<Option<Progress>>;

    /// Retrieve the queue item for a pair.
    ///
    /// Returns `Ok(None)` if the pair was never scheduled.
    fn queue_item(&self, key: &PairKey) -> Result<Option<QueueItem>>;

    /// All queue items for a learner, in no particular order.
    fn queue_items(&self, learner_id: &str) -> Result<Vec<QueueItem>>;

    /// All progress records for a learner, in no particular order.
    fn learner_progress(&self, learner_id: &str) -> Result<Vec<Progress>>;

    /// Save progress without touching the queue item.
    fn save_progress(&self, progress: &Progress) -> Result<()>;

    /// Atomically save progress and queue item together.
    ///
    /// Fails with `Conflict` if the stored queue item does not match
    /// `expected`, in which case nothing is written.
    fn save_pair(&self, progress: &Progress, item: &QueueItem, expected: ItemVersion)
        -> Result<()>;
}

/// Blanket implementation of ReviewStore for Arc-wrapped stores.
///
/// This allows sharing one store between a queue manager and tests.
impl<T: ReviewStore + ?Sized> ReviewStore for Arc<T> {
    fn progress(&self, key: &PairKey) -> Result<Option<Progress>> {
        (**self).progress(key)
    }

    fn queue_item(&self, key: &PairKey) -> Result<Option<QueueItem>> {
        (**self).queue_item(key)
    }

    fn queue_items(&self, learner_id: &str) -> Result<Vec<QueueItem>> {
        (**self).queue_items(learner_id)
    }

    fn learner_progress(&self, learner_id: &str) -> Result<Vec<Progress>> {
        (**self).learner_progress(learner_id)
    }

    fn save_progress(&self, progress: &Progress) -> Result<()> {
        (**self).save_progress(progress)
    }

    fn save_pair(
        &self,
        progress: &Progress,
        item: &QueueItem,
        expected: ItemVersion,
    ) -> Result<()> {
        (**self).save_pair(progress, item, expected)
    }
}
