// src/portal.rs

use async_trait::async_trait;
use url::Url;

use crate::{
    config::Config,
    error::AppError,
    models::{
        question::{QuestionSet, QuestionSetResponse},
        submission::{AttemptResult, SubmissionRecord},
    },
};

/// The exam portal as seen by a test session.
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// `GET /api/test/{test_id}/questions`
    async fn fetch_questions(&self, test_id: &str) -> Result<QuestionSet, AppError>;

    /// `POST /api/test/submit`
    async fn submit_attempt(&self, record: &SubmissionRecord) -> Result<AttemptResult, AppError>;
}

/// Talks to the portal over HTTP with an opaque bearer credential.
#[derive(Debug, Clone)]
pub struct HttpPortal {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpPortal {
    pub fn new(base_url: Url, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.portal_url.clone(), config.portal_token.clone())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("portal URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Maps a non-success response to `AppError::Status`, keeping the portal's
/// `detail`/`error` message when the body carries one.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);

    Err(AppError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl PortalApi for HttpPortal {
    async fn fetch_questions(&self, test_id: &str) -> Result<QuestionSet, AppError> {
        let url = self.endpoint(&["api", "test", test_id, "questions"])?;
        tracing::debug!("Fetching questions from {}", url);

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let payload: QuestionSetResponse = ensure_success(resp).await?.json().await?;
        QuestionSet::try_from(payload)
    }

    async fn submit_attempt(&self, record: &SubmissionRecord) -> Result<AttemptResult, AppError> {
        let url = self.endpoint(&["api", "test", "submit"])?;
        tracing::debug!("Submitting attempt for test {} to {}", record.test_id, url);

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(record)
            .send()
            .await?;

        let result: AttemptResult = ensure_success(resp).await?.json().await?;
        Ok(result)
    }
}
