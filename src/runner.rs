// src/runner.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

use crate::{
    error::AppError,
    models::{
        session::{LoadFailure, TerminationReason},
        submission::{AttemptResult, CompletedAttempt, SubmissionRecord},
    },
    portal::PortalApi,
    session::{FocusSignal, Notice, SessionController, SessionView},
};

const INPUT_BUFFER: usize = 64;

/// Everything the presentation layer can ask of a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Focus(FocusSignal),
    Select { question_id: String, option: usize },
    SelectCurrent(usize),
    Next,
    Previous,
    JumpTo(usize),
    Submit,
    Retry,
}

/// How a session run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(CompletedAttempt),
    Unavailable(LoadFailure),
    /// Input closed while a failed submission was waiting for a manual retry.
    Abandoned(TerminationReason),
}

/// The presentation side of a spawned session.
#[derive(Debug)]
pub struct SessionHandle {
    pub inputs: mpsc::Sender<SessionInput>,
    pub view: watch::Receiver<SessionView>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
}

/// Spawns the session loop on the current runtime.
pub fn spawn_session(
    portal: Arc<dyn PortalApi>,
    controller: SessionController,
    tick: Duration,
) -> (SessionHandle, JoinHandle<SessionOutcome>) {
    let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);
    let (view_tx, view_rx) = watch::channel(controller.view());
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();

    let runner = SessionRunner {
        portal,
        controller,
        tick,
        inputs: input_rx,
        view: view_tx,
        notices: notice_tx,
    };

    let handle = SessionHandle {
        inputs: input_tx,
        view: view_rx,
        notices: notice_rx,
    };

    (handle, tokio::spawn(runner.run()))
}

/// Serializes every trigger of one session through a single task.
pub struct SessionRunner {
    portal: Arc<dyn PortalApi>,
    controller: SessionController,
    tick: Duration,
    inputs: mpsc::Receiver<SessionInput>,
    view: watch::Sender<SessionView>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl SessionRunner {
    pub async fn run(mut self) -> SessionOutcome {
        let fetched = self
            .portal
            .fetch_questions(self.controller.test_id())
            .await;
        self.controller.load(fetched);
        self.publish();

        if let Some(failure) = self.controller.load_failure() {
            return SessionOutcome::Unavailable(failure.clone());
        }

        let (done_tx, mut done_rx) = mpsc::channel::<Result<AttemptResult, AppError>>(1);
        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut inputs_open = true;

        loop {
            let record = tokio::select! {
                _ = ticker.tick() => self.controller.tick(),
                input = self.inputs.recv(), if inputs_open => match input {
                    Some(input) => self.apply(input),
                    None => {
                        tracing::debug!("Session input closed");
                        inputs_open = false;
                        None
                    }
                },
                Some(result) = done_rx.recv() => {
                    match result {
                        Ok(result) => self.controller.submission_succeeded(result),
                        Err(e) => self.controller.submission_failed(&e),
                    };
                    None
                }
            };

            if let Some(record) = record {
                self.dispatch(record, done_tx.clone());
            }
            self.publish();

            if let Some(done) = self.controller.completed() {
                return SessionOutcome::Completed(done.clone());
            }

            if !inputs_open {
                if let Some(reason) = self.controller.retry_reason() {
                    tracing::warn!("Session abandoned with an unsent submission ({})", reason);
                    return SessionOutcome::Abandoned(reason);
                }
            }
        }
    }

    fn apply(&mut self, input: SessionInput) -> Option<SubmissionRecord> {
        let c = &mut self.controller;
        match input {
            SessionInput::Focus(signal) => c.focus_signal(signal),
            SessionInput::Select {
                question_id,
                option,
            } => {
                c.select(&question_id, option);
                None
            }
            SessionInput::SelectCurrent(option) => {
                c.select_current(option);
                None
            }
            SessionInput::Next => {
                c.next();
                None
            }
            SessionInput::Previous => {
                c.previous();
                None
            }
            SessionInput::JumpTo(index) => {
                c.jump_to(index);
                None
            }
            SessionInput::Submit => c.submit(),
            SessionInput::Retry => c.retry_submission(),
        }
    }

    /// Fires the submit call in its own task; the result comes back through `done`.
    /// In-flight requests are never cancelled.
    fn dispatch(&self, record: SubmissionRecord, done: mpsc::Sender<Result<AttemptResult, AppError>>) {
        let portal = Arc::clone(&self.portal);
        tokio::spawn(async move {
            let result = portal.submit_attempt(&record).await;
            if done.send(result).await.is_err() {
                tracing::warn!("Submission finished after the session loop exited");
            }
        });
    }

    fn publish(&mut self) {
        for notice in self.controller.drain_notices() {
            tracing::debug!("Notice: {}", notice);
            // The presentation side may have gone away; the session carries on.
            let _ = self.notices.send(notice);
        }
        self.view.send_replace(self.controller.view());
    }
}
