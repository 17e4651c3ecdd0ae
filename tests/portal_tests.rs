// tests/portal_tests.rs

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use proctor::{
    error::AppError,
    models::{session::TerminationReason, submission::SubmissionRecord},
    portal::{HttpPortal, PortalApi},
    runner::{SessionInput, SessionOutcome, spawn_session},
    session::{Notice, SessionController, SessionSettings},
};
use serde_json::{Value, json};
use url::Url;

const TOKEN: &str = "test-token";

/// Minimal stand-in for the exam portal. Option 0 is always correct.
#[derive(Clone, Default)]
struct PortalState {
    submissions: Arc<Mutex<Vec<Value>>>,
    failing_submits: Arc<AtomicUsize>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

async fn get_questions(Path(test_id): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token"}))).into_response();
    }

    match test_id.as_str() {
        "missing" => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Test not found or inactive"})),
        )
            .into_response(),
        "empty" => Json(json!({"test_id": test_id, "questions": [], "duration_minutes": 30}))
            .into_response(),
        "broken" => Json(json!({
            "test_id": test_id,
            "questions": [{"id": "q1", "question_text": "Pick one", "options": ["only"]}],
            "duration_minutes": 30
        }))
        .into_response(),
        _ => Json(json!({
            "test_id": test_id,
            "questions": [
                {"id": "q1", "question_text": "Capital of France?", "options": ["Paris", "Rome", "Madrid", "Berlin"], "subject_id": "geo"},
                {"id": "q2", "question_text": "2 + 2?", "options": ["4", "3"], "subject_id": "geo"},
                {"id": "q3", "question_text": "Boiling point of water?", "options": ["100C", "90C", "80C"], "subject_id": "geo"}
            ],
            "duration_minutes": 30
        }))
        .into_response(),
    }
}

async fn submit(
    State(state): State<PortalState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token"}))).into_response();
    }

    state.submissions.lock().unwrap().push(body.clone());

    let failing = state
        .failing_submits
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal Server Error"})),
        )
            .into_response();
    }

    let answers = body["answers"].as_object().cloned().unwrap_or_default();
    let score = answers.values().filter(|v| v.as_u64() == Some(0)).count();

    Json(json!({
        "message": "Test submitted successfully",
        "score": score,
        "total": answers.len(),
        "is_malpractice": body["is_malpractice"],
        "attempt_id": uuid::Uuid::new_v4().to_string(),
    }))
    .into_response()
}

/// Helper function to spawn the stub portal on a random port.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_portal(state: PortalState) -> Url {
    let app = Router::new()
        .route("/api/test/{test_id}/questions", get(get_questions))
        .route("/api/test/submit", post(submit))
        .with_state(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap()
}

fn record(answers: &[(&str, usize)], violations: u32, malpractice: bool) -> SubmissionRecord {
    SubmissionRecord {
        test_id: "cat-1".into(),
        student_id: "student-7".into(),
        answers: answers.iter().map(|(q, a)| (q.to_string(), *a)).collect(),
        violation_count: violations,
        is_malpractice: malpractice,
        completed_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn fetch_questions_works() {
    // Arrange
    let base = spawn_portal(PortalState::default()).await;
    let portal = HttpPortal::new(base, TOKEN);

    // Act
    let set = portal.fetch_questions("cat-1").await.expect("fetch failed");

    // Assert
    assert_eq!(set.questions.len(), 3);
    assert_eq!(set.questions[0].text, "Capital of France?");
    assert_eq!(set.questions[1].options, vec!["4".to_string(), "3".to_string()]);
    assert_eq!(set.duration_minutes, Some(30));
}

#[tokio::test]
async fn fetch_missing_test_reports_status() {
    let base = spawn_portal(PortalState::default()).await;
    let portal = HttpPortal::new(base, TOKEN);

    let err = portal.fetch_questions("missing").await.unwrap_err();
    assert_eq!(
        err,
        AppError::Status {
            status: 404,
            message: "Test not found or inactive".into()
        }
    );
}

#[tokio::test]
async fn fetch_with_bad_token_is_unauthorized() {
    let base = spawn_portal(PortalState::default()).await;
    let portal = HttpPortal::new(base, "expired");

    let err = portal.fetch_questions("cat-1").await.unwrap_err();
    assert!(matches!(err, AppError::Status { status: 401, .. }));
}

#[tokio::test]
async fn fetch_rejects_single_option_question() {
    let base = spawn_portal(PortalState::default()).await;
    let portal = HttpPortal::new(base, TOKEN);

    let err = portal.fetch_questions("broken").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidPayload(_)));
}

#[tokio::test]
async fn unreachable_portal_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let portal = HttpPortal::new(Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap(), TOKEN);
    let err = portal.fetch_questions("cat-1").await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)));
}

#[tokio::test]
async fn submit_sends_portal_wire_format() {
    let state = PortalState::default();
    let base = spawn_portal(state.clone()).await;
    let portal = HttpPortal::new(base, TOKEN);

    let result = portal
        .submit_attempt(&record(&[("q1", 0), ("q2", 1)], 2, false))
        .await
        .expect("submit failed");

    assert_eq!(result.score, 1);
    assert_eq!(result.total, 2);
    assert!(!result.is_malpractice);
    assert!(result.attempt_id.is_some());

    let body = state.submissions.lock().unwrap()[0].clone();
    assert_eq!(body["test_id"], "cat-1");
    assert_eq!(body["student_id"], "student-7");
    assert_eq!(body["answers"], json!({"q1": 0, "q2": 1}));
    assert_eq!(body["tab_switches"], 2);
    assert_eq!(body["is_malpractice"], false);
    let completion = body["completion_time"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(completion).is_ok());
}

#[tokio::test]
async fn submit_server_error_is_status() {
    let state = PortalState::default();
    state.failing_submits.store(1, Ordering::SeqCst);
    let base = spawn_portal(state).await;
    let portal = HttpPortal::new(base, TOKEN);

    let err = portal.submit_attempt(&record(&[], 0, false)).await.unwrap_err();
    assert_eq!(
        err,
        AppError::Status {
            status: 500,
            message: "Internal Server Error".into()
        }
    );
}

#[tokio::test]
async fn session_over_http_manual_submit() {
    let state = PortalState::default();
    let base = spawn_portal(state.clone()).await;
    let portal = Arc::new(HttpPortal::new(base, TOKEN));
    let controller = SessionController::new("cat-1", "student-7", SessionSettings::default());

    let (handle, session) = spawn_session(portal, controller, Duration::from_secs(1));
    for (index, option) in [(0, 0), (1, 1), (2, 0)] {
        handle.inputs.send(SessionInput::JumpTo(index)).await.unwrap();
        handle.inputs.send(SessionInput::SelectCurrent(option)).await.unwrap();
    }
    handle.inputs.send(SessionInput::Submit).await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(10), session)
        .await
        .expect("session did not finish")
        .unwrap();

    let done = match outcome {
        SessionOutcome::Completed(done) => done,
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert_eq!(done.reason, TerminationReason::Manual);
    assert_eq!(done.result.score, 2);
    assert_eq!(done.result.total, 3);
    assert_eq!(state.submissions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn session_over_http_retries_after_failure() {
    let state = PortalState::default();
    state.failing_submits.store(1, Ordering::SeqCst);
    let base = spawn_portal(state.clone()).await;
    let portal = Arc::new(HttpPortal::new(base, TOKEN));
    let controller = SessionController::new("cat-1", "student-7", SessionSettings::default());

    let (mut handle, session) = spawn_session(portal, controller, Duration::from_secs(1));
    handle.inputs.send(SessionInput::JumpTo(2)).await.unwrap();
    handle.inputs.send(SessionInput::SelectCurrent(0)).await.unwrap();
    handle.inputs.send(SessionInput::Submit).await.unwrap();

    let failed = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(notice) = handle.notices.recv().await {
            if let Notice::SubmissionFailed { message, .. } = notice {
                return Some(message);
            }
        }
        None
    })
    .await
    .expect("no failure notice");
    assert!(failed.unwrap().contains("500"));

    handle.inputs.send(SessionInput::Retry).await.unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(10), session)
        .await
        .expect("session did not finish")
        .unwrap();

    assert!(matches!(outcome, SessionOutcome::Completed(ref done) if done.result.score == 1));
    assert_eq!(state.submissions.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn session_over_http_empty_test() {
    let base = spawn_portal(PortalState::default()).await;
    let portal = Arc::new(HttpPortal::new(base, TOKEN));
    let controller = SessionController::new("empty", "student-7", SessionSettings::default());

    let (_handle, session) = spawn_session(portal, controller, Duration::from_secs(1));
    let outcome = session.await.unwrap();

    assert!(matches!(outcome, SessionOutcome::Unavailable(_)));
}
