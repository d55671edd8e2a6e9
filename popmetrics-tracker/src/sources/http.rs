//! Shared HTTP plumbing for platform clients
//!
//! - Client-side rate limit (`governor` token bucket)
//! - Retry of 429 (honouring `Retry-After` up to the backoff cap) and 5xx
//!   with exponential backoff
//! - Per-request timeout; a timeout surfaces as [`SourceError::Network`]

use governor::{Quota, RateLimiter};
use popmetrics_common::config::HttpSection;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use super::CallRecorder;
use crate::error::SourceError;
use crate::models::Platform;

/// Project User-Agent; Wikimedia additionally requires a contact address
pub const USER_AGENT: &str = concat!("popmetrics-tracker/", env!("CARGO_PKG_VERSION"));

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_MAX_MS: u64 = 30_000;

/// Knobs shared by every client
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub requests_per_second: u32,
    pub user_agent: String,
}

impl HttpSettings {
    pub fn from_section(section: &HttpSection) -> Self {
        Self {
            timeout: Duration::from_secs(section.timeout_secs),
            max_retries: section.max_retries,
            requests_per_second: section.requests_per_second,
            user_agent: USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self::from_section(&HttpSection::default())
    }
}

/// Rate-limited, retrying JSON fetcher for one platform
pub struct HttpFetcher {
    client: Client,
    platform: Platform,
    max_retries: u32,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl HttpFetcher {
    pub fn new(platform: Platform, settings: &HttpSettings) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(5).min(settings.timeout))
            .build()
            .map_err(|e| SourceError::Config(format!("HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            platform,
            max_retries: settings.max_retries,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send the request built by `build` until it succeeds or retries run out
    ///
    /// The HTTP status of the last response is reported to `recorder`.
    /// An empty success body decodes as `{}`.
    pub async fn get_json<T, F>(&self, build: F, recorder: &mut dyn CallRecorder) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0u32;

        loop {
            self.rate_limiter.until_ready().await;

            let response = build(&self.client).send().await.map_err(|e| {
                if e.is_timeout() {
                    SourceError::Network(format!("{} request timed out: {}", self.platform, e))
                } else {
                    SourceError::Network(format!("{} request failed: {}", self.platform, e))
                }
            })?;

            let status = response.status();
            recorder.set_http_status(status.as_u16());

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.max_retries {
                    return Err(SourceError::RateLimited(format!(
                        "{} still rate limited after {} retries",
                        self.platform, attempt
                    )));
                }
                let Some(wait) = rate_limit_wait(retry_after(&response), attempt) else {
                    return Err(SourceError::RateLimited(format!(
                        "{} asked to wait longer than {}ms",
                        self.platform, BACKOFF_MAX_MS
                    )));
                };
                warn!(platform = %self.platform, attempt, wait_ms = wait.as_millis() as u64, "Rate limited, waiting");
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            if status.is_server_error() && attempt < self.max_retries {
                let wait = backoff(attempt);
                warn!(
                    platform = %self.platform,
                    status = status.as_u16(),
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "Server error, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            return decode(self.platform, response).await;
        }
    }
}

async fn decode<T: DeserializeOwned>(platform: Platform, response: Response) -> Result<T, SourceError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SourceError::Network(format!("{} body read failed: {}", platform, e)))?;

    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(body));
    }
    if !status.is_success() {
        return Err(SourceError::Api {
            status: status.as_u16(),
            body,
        });
    }

    let text = if body.trim().is_empty() { "{}" } else { body.as_str() };
    debug!(%platform, status = status.as_u16(), bytes = body.len(), "Response received");

    serde_json::from_str(text).map_err(|e| SourceError::Parse(format!("{} response: {}", platform, e)))
}

/// `Retry-After` in seconds, if present and numeric
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after)
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Wait before retrying a 429: the server's `Retry-After`, else 1s, 2s, ...
///
/// `None` when the wait exceeds the backoff cap; the call gives up instead.
fn rate_limit_wait(retry_after: Option<Duration>, attempt: u32) -> Option<Duration> {
    let wait = retry_after.unwrap_or(Duration::from_secs(1 + attempt as u64));
    (wait <= Duration::from_millis(BACKOFF_MAX_MS)).then_some(wait)
}

/// 500ms, 1s, 2s, ... capped at 30s
fn backoff(attempt: u32) -> Duration {
    let ms = BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(ms.min(BACKOFF_MAX_MS))
}
