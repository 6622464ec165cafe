//! CLI commands for Reprise.
//!
//! Each command wraps one [`ReviewQueue`] operation and renders its result
//! as human-readable text or JSON:
//! - **Learning**: lesson
//! - **Reviewing**: due, review, skip
//! - **Reporting**: stats

pub mod due;
pub mod lesson;
pub mod review;
pub mod skip;
pub mod stats;

pub use due::DueCommand;
pub use lesson::LessonCommand;
pub use review::ReviewCommand;
pub use skip::SkipCommand;
pub use stats::StatsCommand;

use crate::config::Config;
use crate::content::Catalog;
use crate::core::ReviewQueue;
use crate::error::{exit_codes, Result, ReviewError};
use crate::points::FixedPoints;
use crate::stats::ReviewLog;
use crate::storage::FileReviewStore;

/// Build a file-backed review queue from configuration.
pub fn open_queue(config: &Config) -> Result<ReviewQueue<FileReviewStore>> {
    let data_dir = config
        .data_dir()
        .ok_or_else(|| ReviewError::config("could not determine data directory"))?;
    let store = FileReviewStore::with_dir(data_dir)?;

    let mut queue = ReviewQueue::new(store).with_points(FixedPoints::from(&config.points));

    if let Some(path) = &config.catalog.path {
        queue = queue.with_content(Catalog::load(path)?);
    }

    if let Some(path) = config.history_log_path() {
        queue = queue.with_history(ReviewLog::new(path));
    }

    Ok(queue)
}

/// Exit code for a failed command.
pub fn exit_code_for(err: &ReviewError) -> i32 {
    match err {
        ReviewError::InvalidScore { .. }
        | ReviewError::InvalidLesson { .. }
        | ReviewError::InvalidId { .. } => exit_codes::USAGE,
        _ => exit_codes::ERROR,
    }
}
