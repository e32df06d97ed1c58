use serde::{Deserialize, Serialize};

/// Prefix marking a structured event line on stderr
pub const EVENT_PREFIX: &str = "__SURVEY_EVENT__:";

/// Structured logging events emitted by a survey run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurveyLog {
    /// Run started after the store was loaded
    RunStarted {
        total: usize,
        pending: usize,
        skipped: usize,
    },
    /// A worker picked up a respondent
    RespondentStarted { user: String },
    /// One attempt for one question did not produce a valid answer
    AttemptFailed {
        user: String,
        question_id: u32,
        repetition: usize,
        attempt: u32,
        max_attempts: u32,
        error: String,
    },
    /// All questions answered for every repetition
    RespondentCompleted { user: String },
    /// Respondent aborted; it stays out of the store
    RespondentFailed { user: String, error: String },
    /// Store rewritten with a new record
    RecordSaved {
        user: String,
        path: String,
        total_records: usize,
    },
    /// Run finished
    RunCompleted { succeeded: usize, failed: usize },
}

impl SurveyLog {
    /// Serialize as a single prefixed line
    pub fn to_line(&self) -> Option<String> {
        serde_json::to_string(self)
            .ok()
            .map(|json| format!("{}{}", EVENT_PREFIX, json))
    }

    /// Parse a line produced by [`SurveyLog::to_line`]
    pub fn from_line(line: &str) -> Option<Self> {
        line.strip_prefix(EVENT_PREFIX)
            .and_then(|json| serde_json::from_str(json).ok())
    }

    /// Emit this event to stderr for machine consumers
    pub fn emit(&self) {
        if let Some(line) = self.to_line() {
            use std::io::Write;
            eprintln!("{}", line);
            // Force flush stderr in async/concurrent contexts
            let _ = std::io::stderr().flush();
        }
    }
}

/// Helper macros for survey event logging
#[macro_export]
macro_rules! log_run_start {
    ($total:expr, $pending:expr, $skipped:expr) => {
        $crate::SurveyLog::RunStarted {
            total: $total,
            pending: $pending,
            skipped: $skipped,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_respondent_start {
    ($user:expr) => {
        $crate::SurveyLog::RespondentStarted {
            user: $user.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_attempt_failed {
    ($user:expr, $question_id:expr, $repetition:expr, $attempt:expr, $max:expr, $error:expr) => {
        $crate::SurveyLog::AttemptFailed {
            user: $user.to_string(),
            question_id: $question_id,
            repetition: $repetition,
            attempt: $attempt,
            max_attempts: $max,
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_respondent_complete {
    ($user:expr) => {
        $crate::SurveyLog::RespondentCompleted {
            user: $user.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_respondent_failed {
    ($user:expr, $error:expr) => {
        $crate::SurveyLog::RespondentFailed {
            user: $user.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_record_saved {
    ($user:expr, $path:expr, $total:expr) => {
        $crate::SurveyLog::RecordSaved {
            user: $user.to_string(),
            path: $path.to_string(),
            total_records: $total,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_run_complete {
    ($succeeded:expr, $failed:expr) => {
        $crate::SurveyLog::RunCompleted {
            succeeded: $succeeded,
            failed: $failed,
        }
        .emit();
    };
}

// ============================================================================
// Console Logging Macros
// ============================================================================
// Colored console output for human-readable progress, complementing the
// structured SurveyLog events above.
// ============================================================================

/// Logs an informational message.
///
/// # Example
/// ```
/// use survey_sdk::log_info;
/// log_info!("Loading questionnaire...");
/// ```
///
/// Outputs:
/// ```text
/// ℹ Loading questionnaire...
/// ```
#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        println!("\x1b[36mℹ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[36mℹ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs a warning message.
///
/// # Example
/// ```
/// use survey_sdk::log_warning;
/// log_warning!("respondent {} has no memories", "u1");
/// ```
///
/// Outputs:
/// ```text
/// ⚠ Warning: respondent u1 has no memories
/// ```
#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs progress of an operation.
///
/// # Example
/// ```
/// use survey_sdk::log_progress;
/// log_progress!(3, 5, "respondents");
/// ```
///
/// Outputs:
/// ```text
/// Progress: 3/5 respondents
/// ```
#[macro_export]
macro_rules! log_progress {
    ($current:expr, $total:expr, $item_type:expr) => {
        println!(
            "\x1b[36mProgress: {}/{} {}\x1b[0m",
            $current, $total, $item_type
        );
    };
}

/// Logs that a file has been saved.
///
/// # Example
/// ```
/// use survey_sdk::log_file_saved;
/// log_file_saved!("results/survey_result_memory_repeat1.json");
/// ```
#[macro_export]
macro_rules! log_file_saved {
    ($path:expr) => {
        println!("\x1b[32m✓ Saved: {}\x1b[0m", $path);
    };
}

/// Logs the end-of-run summary.
///
/// # Example
/// ```
/// use survey_sdk::log_summary;
/// log_summary!(8, 2, "results.json");
/// ```
///
/// Outputs:
/// ```text
/// Done: ✓ 8 succeeded, ✗ 2 failed → results.json
/// ```
#[macro_export]
macro_rules! log_summary {
    ($succeeded:expr, $failed:expr, $path:expr) => {
        println!(
            "\x1b[1mDone: \x1b[32m✓ {} succeeded\x1b[0m, \x1b[31m✗ {} failed\x1b[0m → {}",
            $succeeded, $failed, $path
        );
    };
}

// ============================================================================
// End of Console Logging Macros
// ============================================================================
