//! Review scores.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReviewError;

/// Score a learner gives a review.
///
/// Only four values are valid. Anything else is rejected at conversion time
/// so the scheduler never sees an out-of-range score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ReviewScore {
    /// Could not recall the technique.
    Forgot,
    /// Recalled with significant effort.
    Hard,
    /// Recalled correctly.
    Good,
    /// Recalled effortlessly.
    Easy,
}

impl ReviewScore {
    /// All valid scores, lowest first.
    pub const ALL: [ReviewScore; 4] = [Self::Forgot, Self::Hard, Self::Good, Self::Easy];

    /// Numeric value on the 0-5 scale.
    pub fn value(self) -> u8 {
        match self {
            Self::Forgot => 0,
            Self::Hard => 3,
            Self::Good => 4,
            Self::Easy => 5,
        }
    }

    /// Whether this score counts as a successful review (>= 3).
    pub fn is_success(self) -> bool {
        self.value() >= 3
    }

    /// Lowercase name used in output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Forgot => "forgot",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }
}

impl TryFrom<u8> for ReviewScore {
    type Error = ReviewError;

    fn try_from(score: u8) -> Result<Self, Self::Error> {
        match score {
            0 => Ok(Self::Forgot),
            3 => Ok(Self::Hard),
            4 => Ok(Self::Good),
            5 => Ok(Self::Easy),
            _ => Err(ReviewError::InvalidScore { score }),
        }
    }
}

impl From<ReviewScore> for u8 {
    fn from(score: ReviewScore) -> Self {
        score.value()
    }
}

impl fmt::Display for ReviewScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value(), self.name())
    }
}
