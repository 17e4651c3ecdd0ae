// src/session/view.rs

use std::fmt;

use serde::Serialize;

use crate::models::{
    question::Question,
    session::{LoadFailure, TerminationReason},
    submission::AttemptResult,
};

/// Coarse status shown in the session header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Loading,
    Unavailable,
    InProgress,
    Submitting,
    Suspended,
    Completed,
}

/// Everything the presentation layer needs to render the current question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub status: SessionStatus,

    /// Zero-based index of the question on screen.
    pub question_index: usize,
    pub question_count: usize,
    pub question: Option<Question>,
    pub selected: Option<usize>,
    pub answered: usize,
    /// One flag per question, in order: has an answer been recorded.
    pub answered_questions: Vec<bool>,

    pub seconds_remaining: u64,
    /// `MM:SS`
    pub clock: String,
    pub low_time: bool,

    pub violations: u32,
    pub violation_threshold: u32,

    /// Manual submit is offered on the final question only.
    pub can_submit: bool,
    pub can_retry: bool,

    pub failure: Option<LoadFailure>,
}

impl SessionView {
    /// Position through the test, in percent.
    pub fn progress_percent(&self) -> f64 {
        if self.question_count == 0 {
            return 0.0;
        }
        (self.question_index + 1) as f64 / self.question_count as f64 * 100.0
    }
}

/// One-off messages for the student, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    ViolationWarning { count: u32, threshold: u32 },
    Suspended { count: u32 },
    TimeUp,
    SubmissionFailed { reason: TerminationReason, message: String },
    Completed(AttemptResult),
    Unavailable(LoadFailure),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ViolationWarning { count, threshold } => write!(
                f,
                "Warning: tab switch detected! ({}/{}) - the test is suspended at {}.",
                count, threshold, threshold
            ),
            Notice::Suspended { count } => write!(
                f,
                "Test suspended due to malpractice after {} tab switches. Submitting automatically.",
                count
            ),
            Notice::TimeUp => f.write_str("Time is up! Submitting your test automatically."),
            Notice::SubmissionFailed { reason, message } => write!(
                f,
                "Submission ({}) failed: {}. Your answers are kept, retry when ready.",
                reason, message
            ),
            Notice::Completed(result) => {
                if result.is_malpractice {
                    write!(
                        f,
                        "Test submitted with malpractice flagged. Score: {}/{}",
                        result.score, result.total
                    )
                } else {
                    write!(f, "Test submitted successfully. Score: {}/{}", result.score, result.total)
                }
            }
            Notice::Unavailable(failure) => write!(f, "{}", failure),
        }
    }
}
