//! Telegram streaming proxy.
//!
//! Resolves a `file_id` through the Bot API and pipes the file endpoint's
//! body straight to the client, honouring single `Range` requests so video
//! players can seek.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::Response,
};
use futures::{TryStreamExt, stream};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::api::validation::validate_file_id;

/// Inclusive byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    #[must_use]
    pub const fn length(self) -> u64 {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    Full,
    Partial(ByteRange),
    Unsatisfiable,
}

/// Interprets a `Range` header against a resource of `size` bytes.
///
/// Only single `bytes=` ranges are honoured. Syntactically invalid or
/// multi-range headers are ignored and the whole file is served.
#[must_use]
pub fn parse_range(header: Option<&str>, size: u64) -> RangeRequest {
    let Some(byte_spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeRequest::Full;
    };
    if byte_spec.contains(',') {
        return RangeRequest::Full;
    }
    let Some((start, end)) = byte_spec.split_once('-') else {
        return RangeRequest::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        // Suffix form: the last N bytes.
        let Ok(suffix) = end.parse::<u64>() else {
            return RangeRequest::Full;
        };
        if suffix == 0 || size == 0 {
            return RangeRequest::Unsatisfiable;
        }
        return RangeRequest::Partial(ByteRange {
            start: size.saturating_sub(suffix),
            end: size - 1,
        });
    }

    let Ok(start) = start.parse::<u64>() else {
        return RangeRequest::Full;
    };
    let end = if end.is_empty() {
        None
    } else {
        match end.parse::<u64>() {
            Ok(end) => Some(end),
            Err(_) => return RangeRequest::Full,
        }
    };

    if start >= size {
        return RangeRequest::Unsatisfiable;
    }
    let end = end.map_or(size - 1, |e| e.min(size - 1));
    if end < start {
        return RangeRequest::Unsatisfiable;
    }
    RangeRequest::Partial(ByteRange { start, end })
}

/// GET|HEAD /stream/telegram/{file_id}
pub async fn stream_telegram(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let file_id = validate_file_id(&file_id)?;
    let telegram = state.telegram();
    if !telegram.is_configured() {
        return Err(ApiError::telegram_error("Telegram bot token is not configured"));
    }

    let file = telegram
        .get_file(file_id.as_str())
        .await
        .map_err(|e| ApiError::telegram_error(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("Fichier non trouvé sur Telegram".to_string()))?;
    // Without a known size there is nothing to resolve a Range against.
    let size = file.file_size;

    let (content_type, max_age, chunk_size) = {
        let config = state.config().read().await;
        (
            config.streaming.default_content_type.clone(),
            config.streaming.cache_max_age_seconds,
            config.streaming.buffer_size.max(1),
        )
    };
    let content_type = state
        .store()
        .find_source_by_file_id(file_id.as_str())
        .await?
        .and_then(|s| s.mime_type)
        .unwrap_or(content_type);

    let requested = size.map_or(RangeRequest::Full, |size| {
        parse_range(
            headers.get(header::RANGE).and_then(|v| v.to_str().ok()),
            size,
        )
    });
    if requested == RangeRequest::Unsatisfiable {
        return Err(ApiError::RangeNotSatisfiable(size.unwrap_or_default()));
    }

    if method == Method::HEAD {
        return build_response(&content_type, max_age, size, requested, Body::empty());
    }

    let path = file.file_path.ok_or_else(|| {
        ApiError::telegram_error("File is too large for the Bot API file endpoint")
    })?;
    let range = match requested {
        RangeRequest::Partial(r) => Some((r.start, r.end)),
        _ => None,
    };
    let upstream = telegram
        .fetch(&path, range)
        .await
        .map_err(|e| ApiError::telegram_error(e.to_string()))?;

    // Upstream may ignore the range; then the whole file follows.
    let served = if upstream.status() == reqwest::StatusCode::PARTIAL_CONTENT {
        requested
    } else {
        RangeRequest::Full
    };

    tracing::debug!(file_id = %file_id, ?size, ?served, "Streaming Telegram file");
    // Chunks never exceed `streaming.buffer_size`.
    let body = upstream
        .bytes_stream()
        .map_ok(move |chunk| {
            let pieces: Vec<Result<_, reqwest::Error>> = (0..chunk.len())
                .step_by(chunk_size)
                .map(|start| Ok(chunk.slice(start..(start + chunk_size).min(chunk.len()))))
                .collect();
            stream::iter(pieces)
        })
        .try_flatten()
        .inspect_ok(|piece| {
            metrics::counter!("stream_bytes_total").increment(piece.len() as u64);
        });

    build_response(&content_type, max_age, size, served, Body::from_stream(body))
}

/// `size` is `None` when Telegram did not report one; the response then
/// carries no `Content-Length` and advertises no range support.
fn build_response(
    content_type: &str,
    max_age: u64,
    size: Option<u64>,
    range: RangeRequest,
    body: Body,
) -> Result<Response, ApiError> {
    let (status, length, content_range) = match (range, size) {
        (RangeRequest::Partial(r), Some(size)) => (
            StatusCode::PARTIAL_CONTENT,
            Some(r.length()),
            Some(format!("bytes {}-{}/{size}", r.start, r.end)),
        ),
        _ => (StatusCode::OK, size, None),
    };

    let mut builder = Response::builder()
        .status(status)
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("video/mp4")),
        )
        .header(
            header::ACCEPT_RANGES,
            if size.is_some() { "bytes" } else { "none" },
        )
        .header(header::CACHE_CONTROL, format!("public, max-age={max_age}"));
    if let Some(length) = length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }
    if let Some(content_range) = content_range {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    builder
        .body(body)
        .map_err(|e| ApiError::internal(format!("Failed to build stream response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(start: u64, end: u64) -> RangeRequest {
        RangeRequest::Partial(ByteRange { start, end })
    }

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_range(None, 1000), RangeRequest::Full);
        assert_eq!(parse_range(Some("bytes=0-"), 1000), partial(0, 999));
        assert_eq!(parse_range(Some("bytes=100-199"), 1000), partial(100, 199));
        assert_eq!(parse_range(Some("bytes=900-5000"), 1000), partial(900, 999));
        assert_eq!(parse_range(Some("bytes=-100"), 1000), partial(900, 999));
        assert_eq!(parse_range(Some("bytes=-5000"), 1000), partial(0, 999));
    }

    #[test]
    fn test_parse_range_unsatisfiable() {
        assert_eq!(parse_range(Some("bytes=1000-"), 1000), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=500-100"), 1000), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=0-"), 0), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=-0"), 1000), RangeRequest::Unsatisfiable);
    }

    #[test]
    fn test_parse_range_ignores_garbage() {
        assert_eq!(parse_range(Some("items=0-10"), 1000), RangeRequest::Full);
        assert_eq!(parse_range(Some("bytes=abc-"), 1000), RangeRequest::Full);
        assert_eq!(parse_range(Some("bytes=0-10,20-30"), 1000), RangeRequest::Full);
        assert_eq!(parse_range(Some("bytes=10"), 1000), RangeRequest::Full);
    }

    #[test]
    fn test_partial_response_headers() {
        let response =
            build_response("video/x-matroska", 60, Some(1000), partial(100, 199), Body::empty())
                .unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_LENGTH], "100");
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 100-199/1000");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60");
        assert_eq!(headers[header::CONTENT_TYPE], "video/x-matroska");
    }

    #[test]
    fn test_unknown_size_serves_whole_body_without_length() {
        let response =
            build_response("video/mp4", 60, None, RangeRequest::Full, Body::empty()).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert!(headers.get(header::CONTENT_RANGE).is_none());
        assert_eq!(headers[header::ACCEPT_RANGES], "none");
    }
}
