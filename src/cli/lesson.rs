//! Lesson command for Reprise.
//!
//! Records a completed lesson. Completing the last lesson of a node puts it
//! into the review queue.

use chrono::NaiveDate;
use serde::Serialize;

use crate::cli::exit_code_for;
use crate::core::{LessonOutcome, MasteryLevel, ReviewQueue, LESSONS_PER_NODE};
use crate::error::{exit_codes, ReviewError};
use crate::storage::ReviewStore;

/// Options for the lesson command.
#[derive(Debug, Clone, Default)]
pub struct LessonOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the lesson command.
#[derive(Debug, Clone, Serialize)]
pub struct LessonOutput {
    /// Whether the lesson was recorded.
    pub success: bool,
    pub learner_id: String,
    pub node_id: String,
    /// Lesson ordinals completed so far.
    pub lessons_completed: Vec<u8>,
    /// Whether this lesson completed the node.
    pub newly_completed: bool,
    pub mastery_level: MasteryLevel,
    /// First review date, when the node was just scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub exit_code: i32,
}

impl LessonOutput {
    /// Create a successful output.
    pub fn success(outcome: &LessonOutcome) -> Self {
        Self {
            success: true,
            learner_id: outcome.progress.learner_id.clone(),
            node_id: outcome.progress.node_id.clone(),
            lessons_completed: outcome.progress.lessons_completed.iter().copied().collect(),
            newly_completed: outcome.newly_completed,
            mastery_level: outcome.progress.mastery_level,
            due_date: outcome.scheduled.as_ref().map(|item| item.due_date),
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
            lessons_completed: Vec::new(),
            newly_completed: false,
            mastery_level: MasteryLevel::NotStarted,
            due_date: None,
            error: Some(err.to_string()),
            exit_code: exit_code_for(err),
        }
    }
}

/// The lesson command implementation.
pub struct LessonCommand<S: ReviewStore> {
    queue: ReviewQueue<S>,
}

impl<S: ReviewStore> LessonCommand<S> {
    /// Create a new lesson command.
    pub fn new(queue: ReviewQueue<S>) -> Self {
        Self { queue }
    }

    /// Record `lesson` of `node_id` for `learner_id`.
    pub fn run(&self, learner_id: &str, node_id: &str, lesson: u8) -> LessonOutput {
        match self.queue.record_lesson(learner_id, node_id, lesson) {
            Ok(outcome) => LessonOutput::success(&outcome),
            Err(err) => LessonOutput::failure(learner_id, node_id, &err),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &LessonOutput, options: &LessonOptions) -> String {
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
    fn format_human_readable(&self, output: &LessonOutput) -> String {
        if !output.success {
            return format!(
                "Lesson not recorded: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut text = format!(
            "{}: {}/{} lessons complete\n",
            output.node_id,
            output.lessons_completed.len(),
            LESSONS_PER_NODE
        );
        if output.newly_completed {
            text.push_str(&format!("Mastery: {}\n", output.mastery_level));
        }
        if let Some(due) = output.due_date {
            text.push_str(&format!("First review due {}\n", due));
        }
        text
    }
}
