//! Review streaks.
//!
//! A streak is a run of consecutive calendar days with at least one review.
//! The current streak stays alive through today even if today's review has
//! not happened yet: it counts back from today, or from yesterday when there
//! is no review today.

use std::collections::BTreeSet;

use chrono::NaiveDate;

/// Length of the streak that is still alive on `today`.
pub fn current_streak(review_dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let start = if review_dates.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if review_dates.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    let mut day = Some(start);
    while let Some(d) = day {
        if !review_dates.contains(&d) {
            break;
        }
        streak += 1;
        day = d.pred_opt();
    }
    streak
}

/// Longest run of consecutive review days ever.
pub fn longest_streak(review_dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &date in review_dates {
        run = match previous.and_then(|p| p.succ_opt()) {
            Some(next) if next == date => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    longest
}
