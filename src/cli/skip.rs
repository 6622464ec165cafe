//! Skip command for Reprise.
//!
//! Postpones a due review to tomorrow without grading it.

use chrono::NaiveDate;
use serde::Serialize;

use crate::cli::exit_code_for;
use crate::core::{QueueItem, ReviewQueue};
use crate::error::{exit_codes, ReviewError};
use crate::storage::ReviewStore;

/// Options for the skip command.
#[derive(Debug, Clone, Default)]
pub struct SkipOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the skip command.
#[derive(Debug, Clone, Serialize)]
pub struct SkipOutput {
    /// Whether the skip was recorded.
    pub success: bool,
    pub learner_id: String,
    pub node_id: String,
    /// New due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Error message if skip failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub exit_code: i32,
}

impl SkipOutput {
    /// Create a successful output.
    pub fn success(item: &QueueItem) -> Self {
        Self {
            success: true,
            learner_id: item.learner_id.clone(),
            node_id: item.node_id.clone(),
            due_date: Some(item.due_date),
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Create a failed output.
    pub fn failure(learner_id: &str, node_id: &str, err: &ReviewError) -> Self {
        Self {
            success: false,
            learner_id: learner_id.to_string(),
            node_id: node_id.to_string(),
            due_date: None,
            error: Some(err.to_string()),
            exit_code: exit_code_for(err),
        }
    }
}

/// The skip command implementation.
pub struct SkipCommand<S: ReviewStore> {
    queue: ReviewQueue<S>,
}

impl<S: ReviewStore> SkipCommand<S> {
    /// Create a new skip command.
    pub fn new(queue: ReviewQueue<S>) -> Self {
        Self { queue }
    }

    /// Skip the review of `node_id`.
    pub fn run(&self, learner_id: &str, node_id: &str) -> SkipOutput {
        match self.queue.skip_review(learner_id, node_id) {
            Ok(item) => SkipOutput::success(&item),
            Err(err) => SkipOutput::failure(learner_id, node_id, &err),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SkipOutput, options: &SkipOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &SkipOutput) -> String {
        match (output.success, output.due_date) {
            (true, Some(due)) => format!("Skipped {}. Due again {}.\n", output.node_id, due),
            _ => format!(
                "Skip failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
