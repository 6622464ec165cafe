//! Reprise - spaced-repetition review scheduling
//!
//! Reprise decides when a learner should next review a technique they have
//! completed, tracks how well it is retained, and manages the per-learner
//! queue of due reviews. Scheduling follows an SM-2 variant; mastery is a
//! six-level classification of review statistics.

pub mod cli;
pub mod config;
pub mod content;
pub mod core;
pub mod error;
pub mod points;
pub mod stats;
pub mod storage;

pub use config::Config;
pub use content::{Catalog, ContentStore};
pub use crate::core::{
    classify, next_interval, Clock, DueReview, LessonOutcome, MasteryLevel, Node, PairKey,
    Progress, QueueItem, QueueStatus, QueueSummary, ReviewOutcome, ReviewQueue, ReviewScore,
    ReviewStats, ScheduleStep,
};
pub use error::{ReviewError, Result};
pub use points::{FixedPoints, NoPoints, PointsPolicy};
pub use stats::{HistoryEvent, HistoryEventType, ReviewLog};
pub use storage::{FileReviewStore, ItemVersion, MemoryReviewStore, ReviewStore};

// CLI commands
pub use cli::{DueCommand, LessonCommand, ReviewCommand, SkipCommand, StatsCommand};
