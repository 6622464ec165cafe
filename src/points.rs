//! Points awarded for reviews.
//!
//! The award rule is business policy owned by the surrounding application.
//! The queue manager asks a [`PointsPolicy`] after each review and passes the
//! result through unchanged.

use crate::config::PointsConfig;
use crate::core::{Node, ReviewScore};

/// Decides how many points a review is worth.
pub trait PointsPolicy: Send + Sync {
    /// Points for a submitted review of `node` (if known).
    fn points_for(&self, score: ReviewScore, node: Option<&Node>) -> u32;
}

/// Policy that never awards points.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPoints;

impl PointsPolicy for NoPoints {
    fn points_for(&self, _score: ReviewScore, _node: Option<&Node>) -> u32 {
        0
    }
}

/// Flat award for successful reviews with a bonus for easy recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPoints {
    /// Points for any successful review.
    pub per_review: u32,
    /// Extra points when the score is Easy.
    pub easy_bonus: u32,
}

impl FixedPoints {
    /// Create a policy with explicit values.
    pub fn new(per_review: u32, easy_bonus: u32) -> Self {
        Self {
            per_review,
            easy_bonus,
        }
    }
}

impl Default for FixedPoints {
    fn default() -> Self {
        Self::from(&PointsConfig::default())
    }
}

impl From<&PointsConfig> for FixedPoints {
    fn from(config: &PointsConfig) -> Self {
        Self::new(config.per_review, config.easy_bonus)
    }
}

impl PointsPolicy for FixedPoints {
    fn points_for(&self, score: ReviewScore, _node: Option<&Node>) -> u32 {
        match score {
            ReviewScore::Forgot => 0,
            ReviewScore::Easy => self.per_review.saturating_add(self.easy_bonus),
            ReviewScore::Hard | ReviewScore::Good => self.per_review,
        }
    }
}
