//! Review command for Reprise.
//!
//! Submits a recall score for a scheduled node and reports the new schedule.

use chrono::NaiveDate;
use serde::Serialize;

use crate::cli::exit_code_for;
use crate::core::{MasteryLevel, ReviewOutcome, ReviewQueue, ReviewScore};
use crate::error::{exit_codes, ReviewError};
use crate::storage::ReviewStore;

/// Options for the review command.
#[derive(Debug, Clone, Default)]
pub struct ReviewOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the review command.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutput {
    /// Whether the review was recorded.
    pub success: bool,
    pub learner_id: String,
    pub node_id: String,
    /// Submitted score.
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ease_factor: Option<f64>,
    /// Next due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mastery_level: Option<MasteryLevel>,
    pub points_awarded: u32,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub exit_code: i32,
}

impl ReviewOutput {
    /// Create a successful output.
    pub fn success(score: ReviewScore, outcome: &ReviewOutcome) -> Self {
        Self {
            success: true,
            learner_id: outcome.item.learner_id.clone(),
            node_id: outcome.item.node_id.clone(),
            score: score.value(),
            interval_days: Some(outcome.item.interval_days),
            ease_factor: Some(outcome.item.ease_factor),
            due_date: Some(outcome.item.due_date),
            mastery_level: Some(outcome.progress.mastery_level),
            points_awarded: outcome.points_awarded,
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Create a failed output.
    pub fn failure(learner_id: &str, node_id: &str, score: u8, err: &ReviewError) -> Self {
        Self {
            success: false,
            learner_id: learner_id.to_string(),
            node_id: node_id.to_string(),
            score,
            interval_days: None,
            ease_factor: None,
            due_date: None,
            mastery_level: None,
            points_awarded: 0,
            error: Some(err.to_string()),
            exit_code: exit_code_for(err),
        }
    }
}

/// The review command implementation.
pub struct ReviewCommand<S: ReviewStore> {
    queue: ReviewQueue<S>,
}

impl<S: ReviewStore> ReviewCommand<S> {
    /// Create a new review command.
    pub fn new(queue: ReviewQueue<S>) -> Self {
        Self { queue }
    }

    /// Submit a raw score for `node_id`.
    pub fn run(&self, learner_id: &str, node_id: &str, score: u8) -> ReviewOutput {
        let result = ReviewScore::try_from(score).and_then(|s| {
            self.queue
                .submit_review(learner_id, node_id, s)
                .map(|outcome| (s, outcome))
        });

        match result {
            Ok((score, outcome)) => ReviewOutput::success(score, &outcome),
            Err(err) => ReviewOutput::failure(learner_id, node_id, score, &err),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ReviewOutput, options: &ReviewOptions) -> String {
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
    fn format_human_readable(&self, output: &ReviewOutput) -> String {
        if !output.success {
            return format!(
                "Review not recorded: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut text = format!("Reviewed {} (score {}).\n", output.node_id, output.score);
        if let (Some(due), Some(interval)) = (output.due_date, output.interval_days) {
            text.push_str(&format!("Next review: {} (in {} day(s))\n", due, interval));
        }
        if let Some(ease) = output.ease_factor {
            text.push_str(&format!("Ease: {:.2}\n", ease));
        }
        if let Some(level) = output.mastery_level {
            text.push_str(&format!("Mastery: {}\n", level));
        }
        if output.points_awarded > 0 {
            text.push_str(&format!("+{} points\n", output.points_awarded));
        }
        text
    }
}
