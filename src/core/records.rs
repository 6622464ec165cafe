//! Persisted record types for Reprise.
//!
//! These types represent one learner's relationship with one technique node:
//! lesson progress and review statistics ([`Progress`]) and the review
//! schedule ([`QueueItem`]). Both are keyed by [`PairKey`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::mastery::{classify, MasteryLevel, ReviewStats};
use crate::core::scheduler::{ease, ScheduleStep};
use crate::core::score::ReviewScore;
use crate::error::{Result, ReviewError};

/// Number of lessons in every node's lesson set.
pub const LESSONS_PER_NODE: u8 = 3;

// =============================================================================
// Identifiers
// =============================================================================

/// Check that an identifier can be used as a storage key.
///
/// Identifiers become file names in the file store, so they must be
/// non-empty, must not contain path separators and must not start with a dot.
pub fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(['/', '\\'])
        && !id.chars().any(char::is_control);
    if valid {
        Ok(())
    } else {
        Err(ReviewError::invalid_id(id))
    }
}

/// Key for a (learner, node) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    /// Learner identifier.
    pub learner_id: String,
    /// Node identifier.
    pub node_id: String,
}

impl PairKey {
    /// Create a validated pair key.
    pub fn new(learner_id: impl Into<String>, node_id: impl Into<String>) -> Result<Self> {
        let key = Self {
            learner_id: learner_id.into(),
            node_id: node_id.into(),
        };
        validate_id(&key.learner_id)?;
        validate_id(&key.node_id)?;
        Ok(key)
    }

    /// Not found error for this pair.
    pub fn not_found(&self) -> ReviewError {
        ReviewError::not_found(&self.learner_id, &self.node_id)
    }

    /// Conflict error for this pair.
    pub fn conflict(&self) -> ReviewError {
        ReviewError::conflict(&self.learner_id, &self.node_id)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.learner_id, self.node_id)
    }
}

// =============================================================================
// Node
// =============================================================================

/// Difficulty tier of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// A learnable technique. Owned by content authoring; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Difficulty tier.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Ordering hint within the curriculum.
    #[serde(default)]
    pub order: u32,
    /// XP awarded for completing the node's lessons.
    #[serde(default)]
    pub xp_reward: u32,
}

impl Node {
    /// Create a node with default difficulty, order and reward.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            difficulty: Difficulty::default(),
            order: 0,
            xp_reward: 0,
        }
    }

    /// Set the difficulty tier.
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Set the ordering hint.
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Set the XP reward.
    pub fn with_xp_reward(mut self, xp_reward: u32) -> Self {
        self.xp_reward = xp_reward;
        self
    }
}

// =============================================================================
// Progress
// =============================================================================

/// Lesson progress and review statistics for one (learner, node) pair.
///
/// `mastery_level` is `NotStarted` exactly when `completed_at` is absent.
/// `total_reviews` and `avg_review_score` only move on successful reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Learner identifier.
    pub learner_id: String,
    /// Node identifier.
    pub node_id: String,
    /// Completed lesson ordinals (subset of 1..=3).
    pub lessons_completed: BTreeSet<u8>,
    /// When all lessons were first completed. Never cleared.
    pub completed_at: Option<DateTime<Utc>>,
    /// Current mastery level.
    pub mastery_level: MasteryLevel,
    /// Successful reviews recorded.
    pub total_reviews: u32,
    /// Running mean of successful review scores.
    pub avg_review_score: f64,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    /// Create empty progress for a pair.
    pub fn new(key: &PairKey, now: DateTime<Utc>) -> Self {
        Self {
            learner_id: key.learner_id.clone(),
            node_id: key.node_id.clone(),
            lessons_completed: BTreeSet::new(),
            completed_at: None,
            mastery_level: MasteryLevel::NotStarted,
            total_reviews: 0,
            avg_review_score: 0.0,
            updated_at: now,
        }
    }

    /// Key for this record.
    pub fn key(&self) -> PairKey {
        PairKey {
            learner_id: self.learner_id.clone(),
            node_id: self.node_id.clone(),
        }
    }

    /// Whether all lessons are complete.
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Record a completed lesson.
    ///
    /// Returns `true` when this call completed the lesson set for the first
    /// time. Re-recording a lesson is a no-op.
    pub fn complete_lesson(&mut self, lesson: u8, now: DateTime<Utc>) -> Result<bool> {
        if !(1..=LESSONS_PER_NODE).contains(&lesson) {
            return Err(ReviewError::InvalidLesson { lesson });
        }

        let inserted = self.lessons_completed.insert(lesson);
        if inserted {
            self.updated_at = now;
        }

        let all_done = self.lessons_completed.len() == LESSONS_PER_NODE as usize;
        if all_done && self.completed_at.is_none() {
            self.completed_at = Some(now);
            self.reclassify(0);
            return Ok(true);
        }

        Ok(false)
    }

    /// Fold a successful score into the running statistics.
    ///
    /// Failed scores are ignored: only successful reviews count.
    pub fn record_review(&mut self, score: ReviewScore, now: DateTime<Utc>) {
        if !score.is_success() {
            return;
        }
        let previous = self.total_reviews as f64;
        self.avg_review_score =
            (self.avg_review_score * previous + score.value() as f64) / (previous + 1.0);
        self.total_reviews += 1;
        self.updated_at = now;
    }

    /// Classifier inputs for a given interval.
    pub fn review_stats(&self, current_interval_days: u32) -> ReviewStats {
        ReviewStats {
            total_reviews: self.total_reviews,
            avg_review_score: self.avg_review_score,
            current_interval_days,
            completed_at: self.completed_at,
        }
    }

    /// Recompute the mastery level from current statistics.
    pub fn reclassify(&mut self, current_interval_days: u32) -> MasteryLevel {
        self.mastery_level = classify(&self.review_stats(current_interval_days));
        self.mastery_level
    }
}

// =============================================================================
// QueueItem
// =============================================================================

/// Informational status of a queue item. Never blocks rescheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    #[default]
    Pending,
    Completed,
    Skipped,
}

/// Review schedule for one (learner, node) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Learner identifier.
    pub learner_id: String,
    /// Node identifier.
    pub node_id: String,
    /// Date from which the item is reviewable.
    pub due_date: NaiveDate,
    /// Current spacing interval; 0 until the first review.
    pub interval_days: u32,
    /// Ease factor in [1.3, 5.0].
    pub ease_factor: f64,
    /// Informational status.
    pub status: QueueStatus,
    /// Most recent submitted score.
    pub last_review_score: Option<ReviewScore>,
    /// Due date computed by the most recent submission.
    pub next_review_date: Option<NaiveDate>,
    /// When the most recent review was submitted.
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// When the item was scheduled.
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency version, bumped on every write.
    pub version: u64,
}

impl QueueItem {
    /// Create a freshly scheduled item, due today.
    pub fn new(key: &PairKey, today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            learner_id: key.learner_id.clone(),
            node_id: key.node_id.clone(),
            due_date: today,
            interval_days: 0,
            ease_factor: ease::DEFAULT,
            status: QueueStatus::Pending,
            last_review_score: None,
            next_review_date: None,
            last_reviewed_at: None,
            created_at: now,
            version: 0,
        }
    }

    /// Key for this record.
    pub fn key(&self) -> PairKey {
        PairKey {
            learner_id: self.learner_id.clone(),
            node_id: self.node_id.clone(),
        }
    }

    /// Whether the item is reviewable on `as_of`.
    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.due_date <= as_of
    }

    /// Apply a scheduling step computed for `score` on `today`.
    pub fn apply_review(
        &mut self,
        step: ScheduleStep,
        score: ReviewScore,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) {
        let due = add_days(today, step.interval_days);
        self.interval_days = step.interval_days;
        self.ease_factor = step.ease_factor;
        self.due_date = due;
        self.next_review_date = Some(due);
        self.last_review_score = Some(score);
        self.last_reviewed_at = Some(now);
        self.status = QueueStatus::Completed;
        self.version += 1;
    }

    /// Mark the item skipped and postpone it by one day.
    pub fn skip(&mut self, today: NaiveDate) {
        self.due_date = add_days(today, 1);
        self.status = QueueStatus::Skipped;
        self.version += 1;
    }
}

/// Add days to a date, saturating at the latest representable date.
pub fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(days as u64))
        .unwrap_or(NaiveDate::MAX)
}
