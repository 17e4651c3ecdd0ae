// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

/// A question as the student sees it. No correct-answer index ever reaches the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    /// The text content of the question.
    pub text: String,

    /// Ordered options, addressed by zero-based index.
    pub options: Vec<String>,
}

/// Questions plus the duration the portal assigned to the test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    pub questions: Vec<Question>,
    pub duration_minutes: Option<u32>,
}

/// DTO for a question received from the portal.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionPayload {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
}

/// DTO for the question fetch response.
/// `questions` may be absent, which is the same as an empty test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionSetResponse {
    #[serde(default)]
    pub questions: Option<Vec<QuestionPayload>>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.chars().count() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

impl TryFrom<QuestionSetResponse> for QuestionSet {
    type Error = AppError;

    fn try_from(resp: QuestionSetResponse) -> Result<Self, Self::Error> {
        let payloads = resp.questions.unwrap_or_default();
        let mut questions = Vec::with_capacity(payloads.len());

        for payload in payloads {
            payload.validate()?;
            questions.push(Question {
                id: payload.id,
                text: payload.question_text,
                options: payload.options,
            });
        }

        // Zero means "not configured" on the portal side.
        let duration_minutes = resp.duration_minutes.filter(|m| *m > 0);

        Ok(QuestionSet {
            questions,
            duration_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_converts() {
        let resp: QuestionSetResponse = serde_json::from_value(json!({
            "test_id": "t-1",
            "questions": [
                {"id": "q1", "question_text": "2 + 2?", "options": ["3", "4"], "subject_id": "s"}
            ],
            "duration_minutes": 30
        }))
        .unwrap();

        let set = QuestionSet::try_from(resp).unwrap();
        assert_eq!(set.questions.len(), 1);
        assert_eq!(set.questions[0].text, "2 + 2?");
        assert_eq!(set.duration_minutes, Some(30));
    }

    #[test]
    fn test_absent_questions_is_empty() {
        let resp: QuestionSetResponse = serde_json::from_value(json!({})).unwrap();
        let set = QuestionSet::try_from(resp).unwrap();
        assert!(set.questions.is_empty());
        assert_eq!(set.duration_minutes, None);
    }

    #[test]
    fn test_zero_duration_is_unset() {
        let resp: QuestionSetResponse =
            serde_json::from_value(json!({"questions": [], "duration_minutes": 0})).unwrap();
        assert_eq!(QuestionSet::try_from(resp).unwrap().duration_minutes, None);
    }

    #[test]
    fn test_single_option_rejected() {
        let resp: QuestionSetResponse = serde_json::from_value(json!({
            "questions": [{"id": "q1", "question_text": "?", "options": ["only"]}]
        }))
        .unwrap();

        let err = QuestionSet::try_from(resp).unwrap_err();
        assert!(matches!(err, AppError::InvalidPayload(_)));
    }

    #[test]
    fn test_long_text_accepted_and_options_counted_in_chars() {
        let resp: QuestionSetResponse = serde_json::from_value(json!({
            "questions": [{
                "id": "q".repeat(300),
                "question_text": "x".repeat(10_000),
                "options": ["é".repeat(500), "B".to_string()]
            }]
        }))
        .unwrap();

        let set = QuestionSet::try_from(resp).unwrap();
        assert_eq!(set.questions[0].options[0].chars().count(), 500);
    }

    #[test]
    fn test_option_over_500_chars_rejected() {
        let resp: QuestionSetResponse = serde_json::from_value(json!({
            "questions": [{"id": "q1", "question_text": "?", "options": ["a".repeat(501), "b"]}]
        }))
        .unwrap();

        assert!(QuestionSet::try_from(resp).is_err());
    }

    #[test]
    fn test_empty_text_rejected() {
        let resp: QuestionSetResponse = serde_json::from_value(json!({
            "questions": [{"id": "q1", "question_text": "", "options": ["a", "b"]}]
        }))
        .unwrap();

        assert!(QuestionSet::try_from(resp).is_err());
    }
}
