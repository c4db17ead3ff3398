//! Retrying HTTP client shared by the feed fetcher and the Taskade client.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, Response};
use tokio::time::sleep;
use tracing::warn;

use crate::config::RunConfig;
use crate::{AppError, Result};

/// HTTP client with bounded retry and exponential backoff.
///
/// Transport failures and 5xx responses are treated as transient and
/// retried; anything below 500 (4xx included) is returned to the caller
/// untouched.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    max_retries: u32,
    retry_backoff: f64,
}

impl HttpClient {
    /// Build a client with the configured per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the underlying client cannot be
    /// constructed.
    pub fn new(config: &RunConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self {
            inner,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    /// Issue a request, retrying transient failures up to the configured
    /// bound with exponential backoff between attempts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transient` carrying the last underlying cause
    /// once all attempts are exhausted.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        json_body: Option<&serde_json::Value>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<Response> {
        let mut last_err = String::new();

        for attempt in 1..=self.max_retries {
            let mut request = self
                .inner
                .request(method.clone(), url)
                .headers(headers.clone());
            if let Some(body) = json_body {
                request = request.json(body);
            }
            if let Some(pairs) = query {
                request = request.query(pairs);
            }

            match request.send().await {
                Ok(response) if response.status().as_u16() < 500 => return Ok(response),
                Ok(response) => {
                    last_err = format!("server error {}", response.status());
                }
                Err(err) => {
                    last_err = err.to_string();
                }
            }

            if attempt < self.max_retries {
                let delay = self.retry_backoff.powf(f64::from(attempt - 1));
                warn!(
                    %method,
                    url,
                    attempt,
                    max_retries = self.max_retries,
                    backoff_seconds = delay,
                    error = %last_err,
                    "request failed; backing off before retry"
                );
                sleep(Duration::from_secs_f64(delay)).await;
            }
        }

        Err(AppError::Transient(format!(
            "{method} {url} failed after {} attempts: {last_err}",
            self.max_retries
        )))
    }
}
