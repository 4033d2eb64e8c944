use anyhow::Result;
use reqwest::header::{HeaderValue, RANGE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::http::{RetryPolicy, send_with_retry};
use crate::config::TelegramConfig;

#[derive(Debug, Deserialize)]
struct BotApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// File handle as returned by `getFile`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TelegramFile {
    pub file_id: String,
    pub file_unique_id: Option<String>,
    pub file_size: Option<u64>,
    pub file_path: Option<String>,
}

/// Resolves Telegram file ids and streams their bytes through the Bot API
/// file endpoint.
#[derive(Clone)]
pub struct TelegramFileClient {
    client: Client,
    api_base: String,
    token: String,
    retry: RetryPolicy,
    /// Whole-body budget for file downloads, which outlive API calls.
    stream_timeout: Duration,
}

impl TelegramFileClient {
    #[must_use]
    pub fn with_shared_client(client: Client, config: &TelegramConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
            retry,
            stream_timeout: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }

    fn method_url(&self, method: &str, params: &[(&str, &str)]) -> Result<Url> {
        let base = format!("{}/bot{}/{}", self.api_base, self.token, method);
        Ok(Url::parse_with_params(&base, params)?)
    }

    #[must_use]
    pub fn download_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.api_base,
            self.token,
            file_path.trim_start_matches('/')
        )
    }

    /// Looks up a file id. Telegram answers 400 for ids it does not know,
    /// which maps to `None`.
    pub async fn get_file(&self, file_id: &str) -> Result<Option<TelegramFile>> {
        let url = self.method_url("getFile", &[("file_id", file_id)])?;
        let response = send_with_retry(self.retry, || self.client.get(url.clone())).await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Telegram API error: {} - {}", status, body));
        }

        let body: BotApiResponse<TelegramFile> = response.json().await?;
        if !body.ok {
            return Err(anyhow::anyhow!(
                "Telegram API error: {}",
                body.description.unwrap_or_else(|| "request rejected".to_string())
            ));
        }
        Ok(body.result)
    }

    /// Opens the file body. The response is handed back unread so callers can
    /// stream it; a partial range is forwarded as an HTTP `Range` header.
    pub async fn fetch(&self, file_path: &str, range: Option<(u64, u64)>) -> Result<Response> {
        let mut request = self
            .client
            .get(self.download_url(file_path))
            .timeout(self.stream_timeout);
        if let Some((start, end)) = range {
            request = request.header(RANGE, HeaderValue::from_str(&format!("bytes={start}-{end}"))?);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Telegram file error: {} - {}", status, body));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::get;
    use std::collections::HashMap;

    fn config(base: &str) -> TelegramConfig {
        TelegramConfig {
            bot_token: "123:abc".to_string(),
            api_base_url: base.to_string(),
            ..TelegramConfig::default()
        }
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn download_url_layout() {
        let client = TelegramFileClient::with_shared_client(
            Client::new(),
            &config("https://api.telegram.org/"),
            RetryPolicy::default(),
        );
        assert_eq!(
            client.download_url("videos/file_1.mp4"),
            "https://api.telegram.org/file/bot123:abc/videos/file_1.mp4"
        );
    }

    #[tokio::test]
    async fn get_file_maps_unknown_ids_to_none() {
        let router = Router::new().route(
            "/bot123:abc/getFile",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                if q.get("file_id").map(String::as_str) == Some("known") {
                    (
                        AxumStatus::OK,
                        r#"{"ok":true,"result":{"file_id":"known","file_size":42,"file_path":"videos/a.mp4"}}"#,
                    )
                } else {
                    (
                        AxumStatus::BAD_REQUEST,
                        r#"{"ok":false,"description":"Bad Request: invalid file_id"}"#,
                    )
                }
            }),
        );
        let base = spawn(router).await;
        let client =
            TelegramFileClient::with_shared_client(Client::new(), &config(&base), RetryPolicy::default());

        let file = client.get_file("known").await.unwrap().unwrap();
        assert_eq!(file.file_size, Some(42));
        assert_eq!(file.file_path.as_deref(), Some("videos/a.mp4"));

        assert!(client.get_file("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_forwards_range_header() {
        let router = Router::new().route(
            "/file/bot123:abc/videos/a.mp4",
            get(|headers: HeaderMap| async move {
                let range = headers
                    .get("range")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string();
                (AxumStatus::PARTIAL_CONTENT, range)
            }),
        );
        let base = spawn(router).await;
        let client =
            TelegramFileClient::with_shared_client(Client::new(), &config(&base), RetryPolicy::default());

        let response = client.fetch("videos/a.mp4", Some((10, 19))).await.unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.text().await.unwrap(), "bytes=10-19");
    }
}
