use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::http::{RetryPolicy, send_with_retry};
use crate::config::FilemoonConfig;

/// Filemoon wraps every answer as `{status, msg, result}`; `status` is either
/// the number 200 or the string `"success"` on success.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Value,
    msg: Option<String>,
    #[serde(default)]
    result: Value,
}

impl Envelope {
    fn is_success(&self) -> bool {
        match &self.status {
            Value::Number(n) => n.as_u64() == Some(200),
            Value::String(s) => s.eq_ignore_ascii_case("success") || s == "200",
            _ => false,
        }
    }

    fn into_result(self) -> Result<Value> {
        if self.is_success() {
            Ok(self.result)
        } else {
            Err(anyhow::anyhow!(
                "Filemoon API error: {}",
                self.msg.unwrap_or_else(|| "unknown error".to_string())
            ))
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RemoteUpload {
    pub file_code: String,
    pub player_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    #[serde(alias = "filecode")]
    pub file_code: String,
    pub name: Option<String>,
    pub status: Option<Value>,
    pub size: Option<Value>,
    pub duration: Option<Value>,
    #[serde(default)]
    pub views: Option<Value>,
}

impl FileInfo {
    /// Filemoon reports `200`/`"active"` for playable files.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match &self.status {
            Some(Value::Number(n)) => n.as_u64() == Some(200),
            Some(Value::String(s)) => s == "active" || s == "200",
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileSummary {
    #[serde(alias = "filecode")]
    pub file_code: String,
    #[serde(alias = "name")]
    pub title: Option<String>,
    pub views: Option<Value>,
    pub uploaded: Option<String>,
}

#[derive(Clone)]
pub struct FilemoonClient {
    client: Client,
    config: FilemoonConfig,
    retry: RetryPolicy,
}

impl FilemoonClient {
    #[must_use]
    pub fn with_shared_client(client: Client, config: FilemoonConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            config,
            retry,
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn action_url(&self, action: &str, params: &[(&str, &str)]) -> Result<Url> {
        let base = format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_key,
            action
        );
        Ok(Url::parse_with_params(&base, params)?)
    }

    async fn call(&self, action: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.action_url(action, params)?;
        let response = send_with_retry(self.retry, || self.client.get(url.clone())).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Filemoon API error: {} - {}", status, body));
        }

        let envelope: Envelope = response.json().await?;
        envelope.into_result()
    }

    /// Asks Filemoon to pull `remote_url` itself and returns the new file code.
    pub async fn remote_upload(&self, remote_url: &str, title: Option<&str>) -> Result<RemoteUpload> {
        let mut params = vec![("url", remote_url)];
        if let Some(title) = title {
            params.push(("title", title));
        }
        let result = self.call("upload", &params).await?;

        let file_code = result
            .get("filecode")
            .or_else(|| result.get("file_code"))
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Filemoon upload response carries no file code"))?
            .to_string();

        Ok(RemoteUpload {
            player_url: self.player_url(&file_code),
            file_code,
        })
    }

    pub async fn file_info(&self, file_code: &str) -> Result<Option<FileInfo>> {
        let result = self.call("file_info", &[("file", file_code)]).await?;
        // Older endpoints answer with a one-element array.
        let item = match result {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            Value::Array(_) | Value::Null => return Ok(None),
            other => other,
        };
        Ok(Some(serde_json::from_value(item)?))
    }

    pub async fn delete(&self, file_code: &str) -> Result<()> {
        self.call("delete", &[("file", file_code)]).await?;
        Ok(())
    }

    pub async fn rename(&self, file_code: &str, title: &str) -> Result<()> {
        self.call("rename", &[("file", file_code), ("title", title)])
            .await?;
        Ok(())
    }

    pub async fn list(&self, page: u32, per_page: u32) -> Result<Vec<FileSummary>> {
        let page = page.to_string();
        let per_page = per_page.to_string();
        let result = self
            .call("list", &[("page", page.as_str()), ("per_page", per_page.as_str())])
            .await?;
        let files = result.get("files").cloned().unwrap_or(Value::Array(Vec::new()));
        Ok(serde_json::from_value(files)?)
    }

    #[must_use]
    pub fn player_url(&self, file_code: &str) -> String {
        player_url(&self.config.player_url, file_code)
    }
}

#[must_use]
pub fn player_url(base: &str, file_code: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{file_code}")
    } else {
        format!("{base}/{file_code}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_accepts_both_success_markers() {
        let numeric: Envelope =
            serde_json::from_str(r#"{"status":200,"result":{"filecode":"x"}}"#).unwrap();
        assert!(numeric.is_success());

        let textual: Envelope = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert!(textual.is_success());

        let failed: Envelope =
            serde_json::from_str(r#"{"status":403,"msg":"Invalid key"}"#).unwrap();
        let err = failed.into_result().unwrap_err();
        assert!(err.to_string().contains("Invalid key"));
    }

    #[test]
    fn player_url_joins_cleanly() {
        assert_eq!(player_url("https://filemoon.sx/e/", "abc"), "https://filemoon.sx/e/abc");
        assert_eq!(player_url("https://filemoon.sx/e", "abc"), "https://filemoon.sx/e/abc");
    }

    #[test]
    fn file_info_activity() {
        let info: FileInfo =
            serde_json::from_str(r#"{"filecode":"abc","status":200,"size":"1024"}"#).unwrap();
        assert_eq!(info.file_code, "abc");
        assert!(info.is_active());
    }
}
