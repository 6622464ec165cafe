//! Review interval scheduling.
//!
//! A fixed variant of SM-2. Given the current interval, the current ease
//! factor and a review score, compute the next interval and ease factor.
//!
//! Rules:
//! - Forgot: interval resets to 1 day, ease drops by 0.2
//! - Hard / Good / Easy: ease moves by -0.15 / 0 / +0.15
//! - First success gives 1 day, second gives 3 days, then interval x ease
//! - Easy multiplies the interval by a further 1.3
//!
//! Ease is clamped to [1.3, 5.0] after every adjustment. Rounding is
//! half-away-from-zero (`f64::round`).

use serde::{Deserialize, Serialize};

use crate::core::score::ReviewScore;

/// Scheduling constants.
pub mod ease {
    /// Ease factor assigned to a freshly scheduled item.
    pub const DEFAULT: f64 = 2.5;
    /// Lowest allowed ease factor.
    pub const MIN: f64 = 1.3;
    /// Highest allowed ease factor.
    pub const MAX: f64 = 5.0;
    /// Ease penalty for a forgotten review.
    pub const FORGOT_PENALTY: f64 = 0.2;
    /// Ease delta for a hard review.
    pub const HARD_DELTA: f64 = -0.15;
    /// Ease delta for an easy review.
    pub const EASY_DELTA: f64 = 0.15;
    /// Interval multiplier applied on top of the ease for easy reviews.
    pub const EASY_BONUS: f64 = 1.3;
}

/// Interval after the first successful review.
pub const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second successful review.
pub const SECOND_INTERVAL_DAYS: u32 = 3;

/// Interval after a forgotten review.
pub const RELEARN_INTERVAL_DAYS: u32 = 1;

/// Result of a scheduling step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStep {
    /// Days until the next review.
    pub interval_days: u32,
    /// Ease factor to carry into the next review.
    pub ease_factor: f64,
}

/// Compute the next interval and ease factor.
///
/// Pure and deterministic. A non-finite `ease_factor` is treated as
/// [`ease::DEFAULT`] so the output always lies in [`ease::MIN`, `ease::MAX`].
pub fn next_interval(current_interval: u32, ease_factor: f64, score: ReviewScore) -> ScheduleStep {
    let ease_factor = if ease_factor.is_finite() {
        ease_factor
    } else {
        ease::DEFAULT
    };

    if !score.is_success() {
        return ScheduleStep {
            interval_days: RELEARN_INTERVAL_DAYS,
            ease_factor: clamp_ease(ease_factor - ease::FORGOT_PENALTY),
        };
    }

    let next_ease = clamp_ease(ease_factor + ease_delta(score));

    let mut interval = match current_interval {
        0 => FIRST_INTERVAL_DAYS,
        1 => SECOND_INTERVAL_DAYS,
        n => round_days(n as f64 * next_ease),
    };

    if score == ReviewScore::Easy {
        interval = round_days(interval as f64 * ease::EASY_BONUS);
    }

    ScheduleStep {
        interval_days: interval.max(1),
        ease_factor: next_ease,
    }
}

/// Ease adjustment for a successful score.
fn ease_delta(score: ReviewScore) -> f64 {
    match score {
        ReviewScore::Hard => ease::HARD_DELTA,
        ReviewScore::Easy => ease::EASY_DELTA,
        ReviewScore::Good | ReviewScore::Forgot => 0.0,
    }
}

/// Clamp an ease factor into the allowed range.
pub fn clamp_ease(value: f64) -> f64 {
    value.clamp(ease::MIN, ease::MAX)
}

/// Round a day count half-away-from-zero, saturating at `u32::MAX`.
fn round_days(days: f64) -> u32 {
    // `as` saturates for out-of-range floats
    days.round() as u32
}
