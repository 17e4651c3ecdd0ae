// src/error.rs

use std::fmt;

/// Global Application Error Enum.
/// Every failure the session core can observe is folded into one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    // Missing or malformed configuration
    Config(String),

    // Transport failure (connection refused, timeout imposed by the host, ...)
    Network(String),

    // Portal answered with a non-success status
    Status { status: u16, message: String },

    // Response body could not be decoded or failed validation
    InvalidPayload(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "configuration error: {}", msg),
            AppError::Network(msg) => write!(f, "network error: {}", msg),
            AppError::Status { status, message } => {
                write!(f, "portal returned {}: {}", status, message)
            }
            AppError::InvalidPayload(msg) => write!(f, "invalid payload: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts `reqwest::Error` so portal calls can use `?`.
/// Decode failures are payload errors, everything else is transport.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::InvalidPayload(err.to_string())
        } else if let Some(status) = err.status() {
            AppError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidPayload(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidPayload(err.to_string())
    }
}
