//! Error types for Reprise.
//!
//! The review core returns every error to its caller. Nothing is logged or
//! swallowed inside the scheduler, classifier, or queue manager. The only
//! fail-open path is the review history log, which is written after a review
//! has already been committed (see [`FailOpen`]).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Reprise operations.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// A review score outside {0, 3, 4, 5}.
    #[error("invalid review score: {score} (expected 0, 3, 4 or 5)")]
    InvalidScore { score: u8 },

    /// A lesson ordinal outside 1..=3.
    #[error("invalid lesson ordinal: {lesson} (expected 1, 2 or 3)")]
    InvalidLesson { lesson: u8 },

    /// A learner or node identifier that cannot be used as a storage key.
    #[error("invalid identifier: {id:?}")]
    InvalidId { id: String },

    /// No progress or queue item exists for the pair.
    #[error("no review scheduled for learner {learner_id}, node {node_id}")]
    NotFound { learner_id: String, node_id: String },

    /// A queue item already exists for the pair.
    #[error("review already scheduled for learner {learner_id}, node {node_id}")]
    AlreadyScheduled { learner_id: String, node_id: String },

    /// The node's lessons have not all been completed yet.
    #[error("lessons not completed for learner {learner_id}, node {node_id}")]
    NotCompleted { learner_id: String, node_id: String },

    /// A write was based on a stale read of the queue item.
    #[error("concurrent update detected for learner {learner_id}, node {node_id}")]
    Conflict { learner_id: String, node_id: String },

    /// I/O errors from the persistence layer.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML encoding/decoding errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for Reprise operations.
pub type Result<T> = std::result::Result<T, ReviewError>;

impl ReviewError {
    /// Create a not found error for a learner/node pair.
    pub fn not_found(learner_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::NotFound {
            learner_id: learner_id.into(),
            node_id: node_id.into(),
        }
    }

    /// Create an already scheduled error for a learner/node pair.
    pub fn already_scheduled(learner_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::AlreadyScheduled {
            learner_id: learner_id.into(),
            node_id: node_id.into(),
        }
    }

    /// Create a not completed error for a learner/node pair.
    pub fn not_completed(learner_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::NotCompleted {
            learner_id: learner_id.into(),
            node_id: node_id.into(),
        }
    }

    /// Create a conflict error for a learner/node pair.
    pub fn conflict(learner_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::Conflict {
            learner_id: learner_id.into(),
            node_id: node_id.into(),
        }
    }

    /// Create an invalid identifier error.
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId { id: id.into() }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error came from the persistence layer.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Serde { .. })
    }

    /// Whether a caller may retry the operation.
    ///
    /// Retrying is only meaningful after re-reading current state: a review
    /// delta applied to a stale snapshot corrupts the schedule.
    pub fn is_retryable(&self) -> bool {
        self.is_persistence() || matches!(self, Self::Conflict { .. })
    }
}

impl From<io::Error> for ReviewError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for ReviewError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Fail-open handling for side channels that must not fail a committed write.
pub trait FailOpen<T> {
    /// Log a warning on error and return the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }
}

/// Exit codes for the `reprise` CLI.
pub mod exit_codes {
    /// Command succeeded.
    pub const SUCCESS: i32 = 0;

    /// Command failed.
    pub const ERROR: i32 = 1;

    /// Caller supplied invalid input (bad score, lesson, or id).
    pub const USAGE: i32 = 2;
}
