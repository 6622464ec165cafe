//! Reprise - spaced-repetition review scheduling
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use reprise::cli::open_queue;
use reprise::config::{reprise_home, Config};
use reprise::error::exit_codes;

// =============================================================================
// CLI Definition
// =============================================================================

/// Reprise - spaced-repetition review scheduling
#[derive(Parser)]
#[command(name = "reprise")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a completed lesson (1-3) of a node
    Lesson {
        /// Node identifier
        node: String,
        /// Lesson ordinal (1, 2 or 3)
        lesson: u8,
        /// Learner identifier
        #[arg(long, short)]
        learner: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List reviews that are due
    Due {
        /// Learner identifier
        #[arg(long, short)]
        learner: String,
        /// List as of this date (YYYY-MM-DD, default today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Submit a review score (0 forgot, 3 hard, 4 good, 5 easy)
    Review {
        /// Node identifier
        node: String,
        /// Recall score
        score: u8,
        /// Learner identifier
        #[arg(long, short)]
        learner: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Postpone a due review to tomorrow
    Skip {
        /// Node identifier
        node: String,
        /// Learner identifier
        #[arg(long, short)]
        learner: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show queue and mastery statistics
    Stats {
        /// Learner identifier
        #[arg(long, short)]
        learner: String,
        /// Report as of this date (YYYY-MM-DD, default today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("reprise error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to `<reprise_home>/crash.log` and exits with the error code.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("reprise panic: {}", info);

        if let Some(home) = reprise_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::ERROR);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Lesson {
            node,
            lesson,
            learner,
            json,
            quiet,
        } => run_lesson(&learner, &node, lesson, json, quiet),
        Commands::Due {
            learner,
            as_of,
            json,
            quiet,
        } => run_due(&learner, as_of, json, quiet),
        Commands::Review {
            node,
            score,
            learner,
            json,
            quiet,
        } => run_review(&learner, &node, score, json, quiet),
        Commands::Skip {
            node,
            learner,
            json,
            quiet,
        } => run_skip(&learner, &node, json, quiet),
        Commands::Stats {
            learner,
            as_of,
            json,
            quiet,
        } => run_stats(&learner, as_of, json, quiet),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Print formatted output unless it is empty.
fn print_output(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted.trim_end());
    }
}

/// Convert a command exit code to a process exit code.
fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(code as u8)
}

fn run_lesson(
    learner: &str,
    node: &str,
    lesson: u8,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use reprise::cli::lesson::{LessonCommand, LessonOptions};

    let config = Config::load();
    let cmd = LessonCommand::new(open_queue(&config)?);
    let options = LessonOptions { json, quiet };

    let output = cmd.run(learner, node, lesson);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_due(
    learner: &str,
    as_of: Option<NaiveDate>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use reprise::cli::due::{DueCommand, DueOptions};

    let config = Config::load();
    let cmd = DueCommand::new(open_queue(&config)?);
    let options = DueOptions { json, quiet, as_of };

    let output = cmd.run(learner, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_review(
    learner: &str,
    node: &str,
    score: u8,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use reprise::cli::review::{ReviewCommand, ReviewOptions};

    let config = Config::load();
    let cmd = ReviewCommand::new(open_queue(&config)?);
    let options = ReviewOptions { json, quiet };

    let output = cmd.run(learner, node, score);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_skip(
    learner: &str,
    node: &str,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use reprise::cli::skip::{SkipCommand, SkipOptions};

    let config = Config::load();
    let cmd = SkipCommand::new(open_queue(&config)?);
    let options = SkipOptions { json, quiet };

    let output = cmd.run(learner, node);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_stats(
    learner: &str,
    as_of: Option<NaiveDate>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use reprise::cli::stats::{StatsCommand, StatsOptions};

    let config = Config::load();
    let cmd = StatsCommand::new(open_queue(&config)?);
    let options = StatsOptions { json, quiet, as_of };

    let output = cmd.run(learner, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}
