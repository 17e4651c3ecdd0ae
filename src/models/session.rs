// src/models/session.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One student's attempt at one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSession {
    pub test_id: String,
    pub student_id: String,

    /// Fixed when the questions load.
    pub duration_seconds: u64,

    pub started_at: DateTime<Utc>,
}

/// Why a session ended.
///
/// Ordered by precedence: when a failed submission is retried after a
/// stronger trigger has been observed, the stronger reason wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Manual,
    Timeout,
    Malpractice,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::Manual => "manual",
            TerminationReason::Timeout => "timeout",
            TerminationReason::Malpractice => "malpractice",
        };
        f.write_str(s)
    }
}

/// Why a session never became active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum LoadFailure {
    /// The test has no questions, or has expired.
    NoQuestions,
    /// The fetch itself failed.
    FetchFailed(String),
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFailure::NoQuestions => f.write_str("this test has no questions or has expired"),
            LoadFailure::FetchFailed(msg) => write!(f, "could not load the test: {}", msg),
        }
    }
}
