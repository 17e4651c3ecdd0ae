// src/models/submission.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::session::{TerminationReason, TestSession};

/// The payload sent exactly once per session.
/// Serializes to the portal's submit request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub test_id: String,
    pub student_id: String,

    /// Question ID -> selected option index.
    pub answers: BTreeMap<String, usize>,

    #[serde(rename = "tab_switches")]
    pub violation_count: u32,

    pub is_malpractice: bool,

    #[serde(rename = "completion_time")]
    pub completed_at: DateTime<Utc>,
}

/// Portal response to a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub score: u32,
    pub total: u32,
    pub is_malpractice: bool,
    #[serde(default)]
    pub attempt_id: Option<String>,
}

/// A session that reached its terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedAttempt {
    pub session: TestSession,
    pub question_count: usize,
    pub reason: TerminationReason,
    pub record: SubmissionRecord,
    pub result: AttemptResult,
}
