// src/session/controller.rs

use std::collections::VecDeque;

use chrono::Utc;

use crate::{
    config::{DEFAULT_DURATION_MINUTES, LOW_TIME_WARNING_SECONDS, VIOLATION_THRESHOLD},
    error::AppError,
    models::{
        question::{Question, QuestionSet},
        session::{LoadFailure, TerminationReason, TestSession},
        submission::{AttemptResult, CompletedAttempt, SubmissionRecord},
    },
    session::{
        ledger::AnswerLedger,
        monitor::{FocusSignal, ViolationMonitor},
        timer::CountdownTimer,
        view::{Notice, SessionStatus, SessionView},
    },
};

/// Tunables for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub violation_threshold: u32,
    pub default_duration_minutes: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            violation_threshold: VIOLATION_THRESHOLD,
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }
}

/// Single-acquisition guard around the submit call.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SubmissionGuard {
    Idle,
    InFlight {
        reason: TerminationReason,
        record: SubmissionRecord,
    },
    /// The last attempt failed; a retry reuses this reason.
    Failed(TerminationReason),
}

/// Data owned by a loaded, not yet terminated session.
#[derive(Debug, Clone)]
pub struct Attempt {
    session: TestSession,
    questions: Vec<Question>,
    cursor: usize,
    ledger: AnswerLedger,
    guard: SubmissionGuard,
}

impl Attempt {
    pub fn ledger(&self) -> &AnswerLedger {
        &self.ledger
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.guard, SubmissionGuard::InFlight { .. })
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.cursor]
    }

    fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }

    fn take_in_flight(&mut self) -> Option<(TerminationReason, SubmissionRecord)> {
        match std::mem::replace(&mut self.guard, SubmissionGuard::Idle) {
            SubmissionGuard::InFlight { reason, record } => Some((reason, record)),
            other => {
                self.guard = other;
                None
            }
        }
    }
}

/// Lifecycle of one test attempt. Transitions only move forward.
#[derive(Debug, Clone)]
pub enum SessionState {
    Loading,
    Unavailable(LoadFailure),
    Active(Attempt),
    Suspended(Attempt),
    Terminal(CompletedAttempt),
}

/// Orchestrates timer, monitor and ledger for one attempt and owns the
/// one-shot submission protocol.
///
/// Every trigger re-checks the current state before acting, so callers may
/// deliver ticks, focus signals and user input in any interleaving. Methods
/// that can start a submission return the record to send; the caller reports
/// back through [`submission_succeeded`](Self::submission_succeeded) or
/// [`submission_failed`](Self::submission_failed).
#[derive(Debug)]
pub struct SessionController {
    test_id: String,
    student_id: String,
    default_duration_minutes: u32,
    timer: CountdownTimer,
    monitor: ViolationMonitor,
    state: SessionState,
    notices: VecDeque<Notice>,
}

impl SessionController {
    pub fn new(
        test_id: impl Into<String>,
        student_id: impl Into<String>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            student_id: student_id.into(),
            default_duration_minutes: settings.default_duration_minutes,
            timer: CountdownTimer::new(settings.default_duration_minutes),
            monitor: ViolationMonitor::new(settings.violation_threshold),
            state: SessionState::Loading,
            notices: VecDeque::new(),
        }
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    pub fn monitor(&self) -> &ViolationMonitor {
        &self.monitor
    }

    pub fn completed(&self) -> Option<&CompletedAttempt> {
        match &self.state {
            SessionState::Terminal(done) => Some(done),
            _ => None,
        }
    }

    pub fn load_failure(&self) -> Option<&LoadFailure> {
        match &self.state {
            SessionState::Unavailable(failure) => Some(failure),
            _ => None,
        }
    }

    /// The reason a retry would use, if a submission failed and nothing is in flight.
    pub fn retry_reason(&self) -> Option<TerminationReason> {
        match &self.state {
            SessionState::Active(a) | SessionState::Suspended(a) => match a.guard {
                SubmissionGuard::Failed(reason) => Some(reason),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn awaiting_retry(&self) -> bool {
        self.retry_reason().is_some()
    }

    /// Takes the notices accumulated since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Applies the question fetch result. Only meaningful while loading.
    ///
    /// Returns `true` when the session became active; timer and monitor
    /// start at this instant.
    pub fn load(&mut self, fetched: Result<QuestionSet, AppError>) -> bool {
        if !matches!(self.state, SessionState::Loading) {
            tracing::warn!("Ignoring question load for test {}: already loaded", self.test_id);
            return false;
        }

        let set = match fetched {
            Ok(set) => set,
            Err(e) => {
                tracing::error!("Failed to load questions for test {}: {}", self.test_id, e);
                self.enter_unavailable(LoadFailure::FetchFailed(e.to_string()));
                return false;
            }
        };

        if set.questions.is_empty() {
            tracing::info!("Test {} has no questions", self.test_id);
            self.enter_unavailable(LoadFailure::NoQuestions);
            return false;
        }

        let minutes = set.duration_minutes.unwrap_or(self.default_duration_minutes);
        self.timer.set_duration(minutes);

        let session = TestSession {
            test_id: self.test_id.clone(),
            student_id: self.student_id.clone(),
            duration_seconds: self.timer.seconds_remaining(),
            started_at: Utc::now(),
        };

        tracing::info!(
            "Test {} started for student {}: {} questions, {} minutes",
            self.test_id,
            self.student_id,
            set.questions.len(),
            minutes
        );

        self.state = SessionState::Active(Attempt {
            session,
            questions: set.questions,
            cursor: 0,
            ledger: AnswerLedger::new(),
            guard: SubmissionGuard::Idle,
        });
        self.timer.start();
        self.monitor.activate();
        true
    }

    /// One abstract second elapsed.
    pub fn tick(&mut self) -> Option<SubmissionRecord> {
        if !matches!(self.state, SessionState::Active(_)) {
            return None;
        }

        self.timer.tick()?;
        self.timer.pause();
        self.notices.push_back(Notice::TimeUp);
        self.begin_submission(TerminationReason::Timeout)
    }

    /// Feeds a host focus signal; the third counted loss suspends and submits.
    pub fn focus_signal(&mut self, signal: FocusSignal) -> Option<SubmissionRecord> {
        if !matches!(self.state, SessionState::Active(_)) {
            return None;
        }

        let notice = self.monitor.observe(signal)?;
        if !notice.suspended {
            self.notices.push_back(Notice::ViolationWarning {
                count: notice.count,
                threshold: self.monitor.threshold(),
            });
            return None;
        }

        self.notices.push_back(Notice::Suspended {
            count: notice.count,
        });
        self.timer.pause();
        self.state = match std::mem::replace(&mut self.state, SessionState::Loading) {
            SessionState::Active(mut attempt) => {
                attempt.ledger.freeze();
                SessionState::Suspended(attempt)
            }
            other => other,
        };
        tracing::warn!(
            "Test {} suspended for student {} after {} violations",
            self.test_id,
            self.student_id,
            notice.count
        );

        self.begin_submission(TerminationReason::Malpractice)
    }

    /// Records an answer. No-op unless the session is active, time remains
    /// and no submission is in flight.
    pub fn select(&mut self, question_id: &str, option: usize) -> bool {
        let expired = self.timer.is_expired();
        let SessionState::Active(attempt) = &mut self.state else {
            tracing::debug!("Answer for {} ignored: session not active", question_id);
            return false;
        };

        if expired || attempt.is_submitting() {
            tracing::debug!("Answer for {} ignored: submission pending", question_id);
            return false;
        }

        if !attempt.questions.iter().any(|q| q.id == question_id) {
            tracing::warn!("Answer for unknown question {} ignored", question_id);
            return false;
        }

        attempt.ledger.select(question_id, option)
    }

    /// Answers the question on screen.
    pub fn select_current(&mut self, option: usize) -> bool {
        let question_id = match &self.state {
            SessionState::Active(attempt) => attempt.current_question().id.clone(),
            _ => return false,
        };
        self.select(&question_id, option)
    }

    pub fn next(&mut self) -> Option<usize> {
        self.navigate(|cursor| cursor.saturating_add(1))
    }

    pub fn previous(&mut self) -> Option<usize> {
        self.navigate(|cursor| cursor.saturating_sub(1))
    }

    /// Moves to `index`, clamped to the last question.
    pub fn jump_to(&mut self, index: usize) -> Option<usize> {
        self.navigate(|_| index)
    }

    fn navigate(&mut self, step: impl FnOnce(usize) -> usize) -> Option<usize> {
        let SessionState::Active(attempt) = &mut self.state else {
            return None;
        };
        attempt.cursor = step(attempt.cursor).min(attempt.last_index());
        Some(attempt.cursor)
    }

    /// Manual submit, offered on the final question only.
    pub fn submit(&mut self) -> Option<SubmissionRecord> {
        let SessionState::Active(attempt) = &self.state else {
            tracing::debug!("Submit ignored: session not active");
            return None;
        };

        if attempt.cursor != attempt.last_index() {
            tracing::debug!("Submit ignored: not on the final question");
            return None;
        }

        let reason = match attempt.guard {
            SubmissionGuard::Failed(reason) => reason,
            _ => TerminationReason::Manual,
        };
        self.begin_submission(reason)
    }

    /// Re-issues a failed submission with its original trigger.
    pub fn retry_submission(&mut self) -> Option<SubmissionRecord> {
        let reason = self.retry_reason()?;
        self.begin_submission(reason)
    }

    fn begin_submission(&mut self, reason: TerminationReason) -> Option<SubmissionRecord> {
        let violation_count = self.monitor.count();
        let attempt = match &mut self.state {
            SessionState::Active(a) | SessionState::Suspended(a) => a,
            _ => {
                tracing::debug!("Dropping {} trigger: session not running", reason);
                return None;
            }
        };

        if let SubmissionGuard::InFlight { reason: current, .. } = &attempt.guard {
            tracing::debug!(
                "Dropping {} trigger: {} submission already in flight",
                reason,
                current
            );
            return None;
        }

        let record = SubmissionRecord {
            test_id: attempt.session.test_id.clone(),
            student_id: attempt.session.student_id.clone(),
            answers: attempt.ledger.snapshot(),
            violation_count,
            is_malpractice: reason == TerminationReason::Malpractice,
            completed_at: Utc::now(),
        };

        tracing::info!(
            "Submitting test {} ({}): {} answers, {} violations",
            record.test_id,
            reason,
            record.answers.len(),
            violation_count
        );

        attempt.guard = SubmissionGuard::InFlight {
            reason,
            record: record.clone(),
        };
        Some(record)
    }

    /// The in-flight submission was accepted; the session becomes terminal.
    pub fn submission_succeeded(&mut self, result: AttemptResult) -> bool {
        let (reason, record) = match &mut self.state {
            SessionState::Active(a) | SessionState::Suspended(a) => match a.take_in_flight() {
                Some(in_flight) => in_flight,
                None => {
                    tracing::warn!("Submission result without a submission in flight");
                    return false;
                }
            },
            _ => {
                tracing::warn!("Submission result for a session that is not running");
                return false;
            }
        };

        let attempt = match std::mem::replace(&mut self.state, SessionState::Loading) {
            SessionState::Active(a) | SessionState::Suspended(a) => a,
            other => {
                self.state = other;
                return false;
            }
        };

        self.timer.pause();
        self.monitor.stop();

        tracing::info!(
            "Test {} submitted ({}): score {}/{}",
            self.test_id,
            reason,
            result.score,
            result.total
        );

        self.notices.push_back(Notice::Completed(result.clone()));
        self.state = SessionState::Terminal(CompletedAttempt {
            session: attempt.session,
            question_count: attempt.questions.len(),
            reason,
            record,
            result,
        });
        true
    }

    /// The in-flight submission failed; the guard is released for a retry.
    pub fn submission_failed(&mut self, error: &AppError) -> bool {
        let expired = self.timer.is_expired();
        let (attempt, suspended) = match &mut self.state {
            SessionState::Active(a) => (a, false),
            SessionState::Suspended(a) => (a, true),
            _ => return false,
        };

        let Some((reason, _)) = attempt.take_in_flight() else {
            tracing::warn!("Submission failure without a submission in flight");
            return false;
        };

        // Triggers dropped while the request was in flight still count.
        let mut retry_reason = reason;
        if expired {
            retry_reason = retry_reason.max(TerminationReason::Timeout);
        }
        if suspended {
            retry_reason = retry_reason.max(TerminationReason::Malpractice);
        }
        attempt.guard = SubmissionGuard::Failed(retry_reason);

        tracing::error!("Submission of test {} ({}) failed: {}", self.test_id, reason, error);
        self.notices.push_back(Notice::SubmissionFailed {
            reason: retry_reason,
            message: error.to_string(),
        });
        true
    }

    fn enter_unavailable(&mut self, failure: LoadFailure) {
        self.notices.push_back(Notice::Unavailable(failure.clone()));
        self.state = SessionState::Unavailable(failure);
    }

    pub fn view(&self) -> SessionView {
        let seconds_remaining = self.timer.seconds_remaining();
        let mut view = SessionView {
            status: SessionStatus::Loading,
            question_index: 0,
            question_count: 0,
            question: None,
            selected: None,
            answered: 0,
            answered_questions: Vec::new(),
            seconds_remaining,
            clock: self.timer.formatted(),
            low_time: seconds_remaining < LOW_TIME_WARNING_SECONDS,
            violations: self.monitor.count(),
            violation_threshold: self.monitor.threshold(),
            can_submit: false,
            can_retry: self.awaiting_retry(),
            failure: None,
        };

        match &self.state {
            SessionState::Loading => {
                view.low_time = false;
            }
            SessionState::Unavailable(failure) => {
                view.status = SessionStatus::Unavailable;
                view.low_time = false;
                view.failure = Some(failure.clone());
            }
            SessionState::Active(attempt) | SessionState::Suspended(attempt) => {
                let question = attempt.current_question();
                view.status = if matches!(self.state, SessionState::Suspended(_)) {
                    SessionStatus::Suspended
                } else if attempt.is_submitting() {
                    SessionStatus::Submitting
                } else {
                    SessionStatus::InProgress
                };
                view.question_index = attempt.cursor;
                view.question_count = attempt.questions.len();
                view.selected = attempt.ledger.selection(&question.id);
                view.question = Some(question.clone());
                view.answered = attempt.ledger.answered_count();
                view.answered_questions = attempt
                    .questions
                    .iter()
                    .map(|q| attempt.ledger.selection(&q.id).is_some())
                    .collect();
                view.can_submit = matches!(self.state, SessionState::Active(_))
                    && !attempt.is_submitting()
                    && attempt.cursor == attempt.last_index();
            }
            SessionState::Terminal(done) => {
                view.status = SessionStatus::Completed;
                view.question_count = done.question_count;
                view.question_index = done.question_count.saturating_sub(1);
                view.answered = done.record.answers.len();
            }
        }

        view
    }
}
