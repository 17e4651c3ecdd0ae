// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

use crate::error::AppError;

/// Number of focus losses that suspends a session.
pub const VIOLATION_THRESHOLD: u32 = 3;

/// Duration used until the portal reports the real one.
pub const DEFAULT_DURATION_MINUTES: u32 = 45;

/// Below this many seconds the clock is shown as running low.
pub const LOW_TIME_WARNING_SECONDS: u64 = 300;

const DEFAULT_TICK_MILLIS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub portal_url: Url,
    pub portal_token: String,
    pub student_id: String,
    pub test_id: String,
    pub rust_log: String,
    pub log_dir: String,
    pub tick: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{} must be set", key)))
        };

        let portal_url = Url::parse(&required("PORTAL_URL")?)?;
        let portal_token = required("PORTAL_TOKEN")?;
        let student_id = required("STUDENT_ID")?;
        let test_id = required("TEST_ID")?;

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());
        let log_dir = lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string());

        let tick_millis = match lookup("TICK_MILLIS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| AppError::Config(format!("TICK_MILLIS is not a positive integer: {}", raw)))?,
            None => DEFAULT_TICK_MILLIS,
        };

        Ok(Self {
            portal_url,
            portal_token,
            student_id,
            test_id,
            rust_log,
            log_dir,
            tick: Duration::from_millis(tick_millis),
        })
    }
}
