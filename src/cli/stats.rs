//! Stats command for Reprise.
//!
//! Displays a learner's queue summary: due counts, mastery distribution and
//! review streaks.

use chrono::NaiveDate;
use serde::Serialize;

use crate::cli::exit_code_for;
use crate::core::{MasteryLevel, QueueSummary, ReviewQueue};
use crate::error::{exit_codes, ReviewError};
use crate::storage::ReviewStore;

/// Options for the stats command.
#[derive(Debug, Clone, Default)]
pub struct StatsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Date to report for (default: today).
    pub as_of: Option<NaiveDate>,
}

/// Output format for the stats command.
#[derive(Debug, Clone, Serialize)]
pub struct StatsOutput {
    /// Whether stats were loaded successfully.
    pub success: bool,
    /// The learner's summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<QueueSummary>,
    /// Error message if stats failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub exit_code: i32,
}

impl StatsOutput {
    /// Create a successful output.
    pub fn success(summary: QueueSummary) -> Self {
        Self {
            success: true,
            summary: Some(summary),
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Create a failed output.
    pub fn failure(err: &ReviewError) -> Self {
        Self {
            success: false,
            summary: None,
            error: Some(err.to_string()),
            exit_code: exit_code_for(err),
        }
    }
}

/// The stats command implementation.
pub struct StatsCommand<S: ReviewStore> {
    queue: ReviewQueue<S>,
}

impl<S: ReviewStore> StatsCommand<S> {
    /// Create a new stats command.
    pub fn new(queue: ReviewQueue<S>) -> Self {
        Self { queue }
    }

    /// Summarize `learner_id`'s queue.
    pub fn run(&self, learner_id: &str, options: &StatsOptions) -> StatsOutput {
        let as_of = options.as_of.unwrap_or_else(|| self.queue.today());
        match self.queue.summary(learner_id, as_of) {
            Ok(summary) => StatsOutput::success(summary),
            Err(err) => StatsOutput::failure(&err),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatsOutput, options: &StatsOptions) -> String {
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
    fn format_human_readable(&self, output: &StatsOutput) -> String {
        let summary = match (&output.summary, output.success) {
            (Some(summary), true) => summary,
            _ => {
                return format!(
                    "Failed to load stats: {}\n",
                    output.error.as_deref().unwrap_or("unknown error")
                )
            }
        };

        let mut text = format!("Review stats for {} ({})\n", summary.learner_id, summary.as_of);
        text.push_str(&format!("{}\n\n", "=".repeat(40)));

        text.push_str(&format!("Due now:       {}\n", summary.due_count));
        text.push_str(&format!("Scheduled:     {}\n", summary.scheduled_count));
        match summary.next_review_date {
            Some(date) => text.push_str(&format!("Next review:   {}\n", date)),
            None => text.push_str("Next review:   -\n"),
        }
        text.push_str(&format!("Total reviews: {}\n", summary.total_reviews));
        text.push_str(&format!(
            "Streak:        {} day(s) (longest {})\n",
            summary.current_streak, summary.longest_streak
        ));

        text.push_str("\nMastery:\n");
        for level in MasteryLevel::ALL.iter().rev() {
            let count = summary.mastery.get(level).copied().unwrap_or(0);
            if count > 0 {
                text.push_str(&format!("  {:<12} {}\n", level.label(), count));
            }
        }

        text
    }
}
