//! Core types and logic for Reprise.
//!
//! This module contains the pure scheduling and mastery rules, the persisted
//! record types, and the review queue manager that ties them to storage.

pub mod clock;
pub mod locks;
pub mod mastery;
pub mod queue;
pub mod records;
pub mod scheduler;
pub mod score;

pub use clock::{Clock, FixedClock, SystemClock};
pub use locks::PairLocks;
pub use mastery::{classify, MasteryLevel, ReviewStats};
pub use queue::{DueReview, LessonOutcome, QueueSummary, ReviewOutcome, ReviewQueue};
pub use records::{
    add_days, validate_id, Difficulty, Node, PairKey, Progress, QueueItem, QueueStatus,
    LESSONS_PER_NODE,
};
pub use scheduler::{clamp_ease, next_interval, ScheduleStep};
pub use score::ReviewScore;
