//! Mastery classification.
//!
//! Mastery is recomputed from review statistics on every evaluation. It is
//! not a ratchet: a learner whose average score drops can fall back a level.
//!
//! Rules are evaluated top-down and the first match wins:
//!
//! | Level | Condition |
//! |-------|-----------|
//! | 0 Not Started | lessons not completed |
//! | 1 Learned     | completed, no successful reviews |
//! | 5 Mastered    | >= 10 reviews, avg >= 4.0, interval > 30 days |
//! | 4 Proficient  | >= 5 reviews, avg >= 4.0 |
//! | 3 Practiced   | >= 3 reviews |
//! | 2 Reviewed    | >= 1 review |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification thresholds.
pub mod thresholds {
    /// Reviews required for Mastered.
    pub const MASTERED_REVIEWS: u32 = 10;
    /// Interval (exclusive) required for Mastered.
    pub const MASTERED_INTERVAL_DAYS: u32 = 30;
    /// Reviews required for Proficient.
    pub const PROFICIENT_REVIEWS: u32 = 5;
    /// Average score required for Mastered and Proficient.
    pub const HIGH_AVERAGE: f64 = 4.0;
    /// Reviews required for Practiced.
    pub const PRACTICED_REVIEWS: u32 = 3;
    /// Reviews required for Reviewed.
    pub const REVIEWED_REVIEWS: u32 = 1;
}

/// Mastery level of a node for one learner, ordinal 0-5.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    #[default]
    NotStarted,
    Learned,
    Reviewed,
    Practiced,
    Proficient,
    Mastered,
}

impl MasteryLevel {
    /// All levels in ordinal order.
    pub const ALL: [MasteryLevel; 6] = [
        Self::NotStarted,
        Self::Learned,
        Self::Reviewed,
        Self::Practiced,
        Self::Proficient,
        Self::Mastered,
    ];

    /// Ordinal value (0-5).
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Level for an ordinal, if in range.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::Learned => "Learned",
            Self::Reviewed => "Reviewed",
            Self::Practiced => "Practiced",
            Self::Proficient => "Proficient",
            Self::Mastered => "Mastered",
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inputs to the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewStats {
    /// Successful reviews recorded.
    pub total_reviews: u32,
    /// Mean of successful review scores.
    pub avg_review_score: f64,
    /// Current spacing interval.
    pub current_interval_days: u32,
    /// When all lessons were completed.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Classify review statistics into a mastery level.
pub fn classify(stats: &ReviewStats) -> MasteryLevel {
    use thresholds::*;

    if stats.completed_at.is_none() {
        return MasteryLevel::NotStarted;
    }

    let reviews = stats.total_reviews;
    let high_average = stats.avg_review_score >= HIGH_AVERAGE;

    if reviews == 0 {
        MasteryLevel::Learned
    } else if reviews >= MASTERED_REVIEWS
        && high_average
        && stats.current_interval_days > MASTERED_INTERVAL_DAYS
    {
        MasteryLevel::Mastered
    } else if reviews >= PROFICIENT_REVIEWS && high_average {
        MasteryLevel::Proficient
    } else if reviews >= PRACTICED_REVIEWS {
        MasteryLevel::Practiced
    } else if reviews >= REVIEWED_REVIEWS {
        MasteryLevel::Reviewed
    } else {
        MasteryLevel::Learned
    }
}
