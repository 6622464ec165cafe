//! Review history for Reprise.
//!
//! The history log (`<reprise_home>/history.log`) is an append-only JSONL
//! record of lesson, scheduling and review events. Streaks are derived from
//! it on demand.

pub mod history;
pub mod streak;

pub use history::{HistoryEvent, HistoryEventType, ReviewLog, HISTORY_SCHEMA_VERSION};
pub use streak::{current_streak, longest_streak};
