//! Run configuration sourced from the process environment.

use std::env;

use crate::{AppError, Result};

/// Default GTFS-Realtime vehicle-position endpoint for KTMB rail.
pub const DEFAULT_FEED_URL: &str =
    "https://api.data.gov.my/gtfs-realtime/vehicle-position/ktmb";

/// Default Taskade REST API base URL.
pub const DEFAULT_TASKADE_BASE_URL: &str = "https://www.taskade.com/api/v1";

/// Title of the dashboard task this tool keeps in sync.
pub const DASHBOARD_TITLE: &str = "KTM Train Status Live Update";

/// Environment variable holding (and stdout key announcing) the task id.
pub const TASK_ID_ENV: &str = "TASKADE_TASK_ID";

/// Immutable per-run configuration, built once at process start.
///
/// Each invocation is a stateless fetch-render-publish cycle; the only
/// state carried between runs is the task id the caller persists.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// GTFS-Realtime feed URL.
    pub feed_url: String,
    /// Taskade API base URL, trailing slash trimmed.
    pub taskade_base_url: String,
    /// Bearer token for the Taskade API.
    pub taskade_api_token: String,
    /// Project whose task list hosts the dashboard task.
    pub taskade_project_id: String,
    /// Known dashboard task id, if the caller persisted one.
    pub taskade_task_id: Option<String>,
    /// Per-request HTTP timeout in seconds.
    pub http_timeout_seconds: u64,
    /// Total request attempts per call, including the first.
    pub max_retries: u32,
    /// Exponential backoff base in seconds (delay = backoff^(attempt-1)).
    pub retry_backoff: f64,
}

impl RunConfig {
    /// Build configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// numeric variable fails to parse or validate.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary lookup function.
    ///
    /// Tests inject a closure over a map instead of mutating the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` on missing required settings or invalid
    /// numeric values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let taskade_api_token = require(&lookup, "TASKADE_API_TOKEN")?;
        let taskade_project_id = require(&lookup, "TASKADE_PROJECT_ID")?;

        let taskade_task_id = lookup(TASK_ID_ENV)
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty());

        let taskade_base_url = lookup("TASKADE_BASE_URL")
            .unwrap_or_else(|| DEFAULT_TASKADE_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        let config = Self {
            feed_url: lookup("GTFSR_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_owned()),
            taskade_base_url,
            taskade_api_token,
            taskade_project_id,
            taskade_task_id,
            http_timeout_seconds: parse_or(&lookup, "HTTP_TIMEOUT", 20)?,
            max_retries: parse_or(&lookup, "MAX_RETRIES", 3)?,
            retry_backoff: parse_or(&lookup, "RETRY_BACKOFF", 1.5)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.taskade_base_url.is_empty() {
            return Err(AppError::Config("TASKADE_BASE_URL must not be empty".into()));
        }
        if self.http_timeout_seconds == 0 {
            return Err(AppError::Config("HTTP_TIMEOUT must be greater than zero".into()));
        }
        if self.max_retries == 0 {
            return Err(AppError::Config("MAX_RETRIES must be at least 1".into()));
        }
        if self.retry_backoff <= 0.0 {
            return Err(AppError::Config("RETRY_BACKOFF must be greater than zero".into()));
        }
        Ok(())
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Config(format!("{key} is required")))
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has invalid value {raw:?}"))),
    }
}
