//! Shared HTTP plumbing for upstream APIs.
//!
//! Every client reuses one pooled `reqwest::Client` and sends through
//! [`send_with_retry`], which retries transport failures and `5xx`/`429`
//! answers a fixed number of times with a fixed pause in between.

use anyhow::Result;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

use crate::config::HttpConfig;

pub fn build_shared_http_client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .user_agent(config.user_agent.clone())
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Never below 1.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

#[must_use]
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Sends the request built by `build`, retrying per `policy`.
///
/// The last response is returned as-is even when its status is retryable, so
/// callers keep the upstream body for their error message.
pub async fn send_with_retry<F>(policy: RetryPolicy, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match build().send().await {
            Ok(response) if attempt < attempts && is_retryable_status(response.status()) => {
                warn!(
                    status = %response.status(),
                    attempt,
                    attempts,
                    "Upstream answered with a retryable status"
                );
            }
            Ok(response) => return Ok(response),
            Err(e) if attempt < attempts && is_retryable_error(&e) => {
                warn!(error = %e, attempt, attempts, "Upstream request failed, retrying");
            }
            Err(e) => return Err(e.into()),
        }

        attempt += 1;
        tokio::time::sleep(policy.backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode as AxumStatus, routing::get};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn flaky_server(failures: u32, status: AxumStatus) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/",
            get(move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < failures {
                        (status, "nope")
                    } else {
                        (AxumStatus::OK, "ok")
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/"), hits)
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::from_millis(5),
        }
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn policy_from_config_never_zero() {
        let config = HttpConfig {
            retry_attempts: 0,
            ..HttpConfig::default()
        };
        assert_eq!(RetryPolicy::from(&config).attempts, 1);
    }

    #[tokio::test]
    async fn recovers_after_server_errors() {
        let (url, hits) = flaky_server(2, AxumStatus::SERVICE_UNAVAILABLE).await;
        let client = reqwest::Client::new();

        let response = send_with_retry(fast_policy(3), || client.get(&url))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_with_last_response() {
        let (url, hits) = flaky_server(10, AxumStatus::INTERNAL_SERVER_ERROR).await;
        let client = reqwest::Client::new();

        let response = send_with_retry(fast_policy(2), || client.get(&url))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (url, hits) = flaky_server(10, AxumStatus::NOT_FOUND).await;
        let client = reqwest::Client::new();

        let response = send_with_retry(fast_policy(3), || client.get(&url))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
