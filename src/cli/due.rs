//! Due command for Reprise.
//!
//! Lists the reviews a learner can take on a given day.

use chrono::NaiveDate;
use serde::Serialize;

use crate::cli::exit_code_for;
use crate::core::{DueReview, QueueStatus, ReviewQueue};
use crate::error::{exit_codes, ReviewError};
use crate::storage::ReviewStore;

/// Options for the due command.
#[derive(Debug, Clone, Default)]
pub struct DueOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Date to list for (default: today).
    pub as_of: Option<NaiveDate>,
}

/// One due review in command output.
#[derive(Debug, Clone, Serialize)]
pub struct DueInfo {
    pub node_id: String,
    /// Node display name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub due_date: NaiveDate,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub status: QueueStatus,
}

impl From<&DueReview> for DueInfo {
    fn from(due: &DueReview) -> Self {
        Self {
            node_id: due.item.node_id.clone(),
            name: due.node.as_ref().map(|n| n.name.clone()),
            due_date: due.item.due_date,
            interval_days: due.item.interval_days,
            ease_factor: due.item.ease_factor,
            status: due.item.status,
        }
    }
}

/// Output format for the due command.
#[derive(Debug, Clone, Serialize)]
pub struct DueOutput {
    /// Whether the listing succeeded.
    pub success: bool,
    pub learner_id: String,
    pub as_of: NaiveDate,
    /// Due reviews in review order.
    pub reviews: Vec<DueInfo>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub exit_code: i32,
}

impl DueOutput {
    /// Create a successful output.
    pub fn success(learner_id: &str, as_of: NaiveDate, due: &[DueReview]) -> Self {
        Self {
            success: true,
            learner_id: learner_id.to_string(),
            as_of,
            reviews: due.iter().map(DueInfo::from).collect(),
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Create a failed output.
    pub fn failure(learner_id: &str, as_of: NaiveDate, err: &ReviewError) -> Self {
        Self {
            success: false,
            learner_id: learner_id.to_string(),
            as_of,
            reviews: Vec::new(),
            error: Some(err.to_string()),
            exit_code: exit_code_for(err),
        }
    }
}

/// The due command implementation.
pub struct DueCommand<S: ReviewStore> {
    queue: ReviewQueue<S>,
}

impl<S: ReviewStore> DueCommand<S> {
    /// Create a new due command.
    pub fn new(queue: ReviewQueue<S>) -> Self {
        Self { queue }
    }

    /// List due reviews for `learner_id`.
    pub fn run(&self, learner_id: &str, options: &DueOptions) -> DueOutput {
        let as_of = options.as_of.unwrap_or_else(|| self.queue.today());
        match self.queue.list_due(learner_id, as_of) {
            Ok(due) => DueOutput::success(learner_id, as_of, &due),
            Err(err) => DueOutput::failure(learner_id, as_of, &err),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &DueOutput, options: &DueOptions) -> String {
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
    fn format_human_readable(&self, output: &DueOutput) -> String {
        if !output.success {
            return format!(
                "Could not list reviews: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.reviews.is_empty() {
            return format!("No reviews due on {}.\n", output.as_of);
        }

        let mut text = format!(
            "{} review(s) due on {}:\n\n",
            output.reviews.len(),
            output.as_of
        );
        for review in &output.reviews {
            let label = review.name.as_deref().unwrap_or(&review.node_id);
            text.push_str(&format!(
                "  {:<30} due {}  interval {}d  ease {:.2}\n",
                label, review.due_date, review.interval_days, review.ease_factor
            ));
        }
        text
    }
}
