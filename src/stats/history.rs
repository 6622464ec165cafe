//! Review history log for Reprise.
//!
//! An append-only JSONL file of lesson, scheduling and review events. The
//! queue's records are the source of truth for scheduling; the history log
//! exists for streaks and auditing and is written after a change commits.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ReviewScore;
use crate::error::{Result, ReviewError};

/// Schema version for history events.
pub const HISTORY_SCHEMA_VERSION: u8 = 1;

/// One line of the history log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEvent {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// When the event happened.
    pub ts: DateTime<Utc>,
    /// Learner the event belongs to.
    pub learner_id: String,
    /// The event type and its data.
    #[serde(flatten)]
    pub data: HistoryEventType,
}

impl HistoryEvent {
    /// Create an event at `ts`.
    pub fn new(learner_id: impl Into<String>, data: HistoryEventType, ts: DateTime<Utc>) -> Self {
        Self {
            v: HISTORY_SCHEMA_VERSION,
            ts,
            learner_id: learner_id.into(),
            data,
        }
    }
}

/// The type of history event and its associated data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HistoryEventType {
    /// A lesson of a node was completed.
    LessonCompleted { node_id: String, lesson: u8 },

    /// A node entered the review queue.
    Scheduled { node_id: String, due_date: NaiveDate },

    /// A review was submitted.
    Reviewed {
        node_id: String,
        score: ReviewScore,
        interval_days: u32,
        ease_factor: f64,
        due_date: NaiveDate,
    },

    /// A due review was skipped.
    Skipped { node_id: String, due_date: NaiveDate },
}

impl HistoryEventType {
    /// Node the event refers to.
    pub fn node_id(&self) -> &str {
        match self {
            Self::LessonCompleted { node_id, .. }
            | Self::Scheduled { node_id, .. }
            | Self::Reviewed { node_id, .. }
            | Self::Skipped { node_id, .. } => node_id,
        }
    }

    /// Get the event name as a string.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::LessonCompleted { .. } => "lesson_completed",
            Self::Scheduled { .. } => "scheduled",
            Self::Reviewed { .. } => "reviewed",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// JSONL writer and reader for history events.
#[derive(Debug, Clone)]
pub struct ReviewLog {
    /// Path to the log file.
    path: PathBuf,
}

impl ReviewLog {
    /// Create a log at the given path. The file is created on first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append an event to the log.
    pub fn append(&self, event: &HistoryEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ReviewError::storage(parent, e))?;
        }

        let json = serde_json::to_string(event)
            .map_err(|e| ReviewError::serde(format!("Failed to serialize history event: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ReviewError::storage(&self.path, e))?;

        writeln!(file, "{}", json).map_err(|e| ReviewError::storage(&self.path, e))?;

        Ok(())
    }

    /// Read all events from the log.
    pub fn read_all(&self) -> Result<Vec<HistoryEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| ReviewError::storage(&self.path, e))?;

        let mut events = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let event: HistoryEvent = serde_json::from_str(line).map_err(|e| {
                ReviewError::serde(format!(
                    "Failed to parse history event on line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            events.push(event);
        }

        Ok(events)
    }

    /// Events for one learner, in log order.
    pub fn read_learner(&self, learner_id: &str) -> Result<Vec<HistoryEvent>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.learner_id == learner_id)
            .collect())
    }

    /// Distinct UTC dates on which a learner submitted at least one review.
    pub fn review_dates(&self, learner_id: &str) -> Result<BTreeSet<NaiveDate>> {
        Ok(self
            .read_learner(learner_id)?
            .into_iter()
            .filter(|e| matches!(e.data, HistoryEventType::Reviewed { .. }))
            .map(|e| e.ts.date_naive())
            .collect())
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
