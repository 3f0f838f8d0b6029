//! Client for the metadata and download endpoints of the download service.

use reqwest::{Client, Response, header::CONTENT_DISPOSITION};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};
use crate::model::{DownloadRequest, ErrorBody, InfoRequest, VideoInfo};

// Messages used when an error response carries no `error` field
const INFO_FALLBACK: &str = "Failed to fetch video info";
const DOWNLOAD_FALLBACK: &str = "Download failed";

/// Handle on the download service. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    /// Service root without a trailing slash
    base_url: String,
}

/// A successful `/api/download` response whose body has not been read yet
pub struct PendingFile {
    response: Response,
    /// Raw `Content-Disposition` header, if any
    pub content_disposition: Option<String>,
    /// Announced body length, if any. Only used for percentages, never trusted for sizing.
    pub content_length: Option<u64>,
}

impl PendingFile {
    /// Streams the body into `out`, reporting the running byte count after
    /// each chunk. Returns the number of bytes written.
    pub async fn write_to<W>(mut self, out: &mut W, mut on_chunk: impl FnMut(u64)) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut received = 0u64;
        while let Some(chunk) = self.response.chunk().await? {
            out.write_all(&chunk).await?;
            received += chunk.len() as u64;
            on_chunk(received);
        }
        out.flush().await?;
        Ok(received)
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST `/api/info`
    pub async fn fetch_info(&self, url: &str) -> Result<VideoInfo> {
        info!(%url, "requesting video info");
        let response = self
            .client
            .post(self.endpoint("/api/info"))
            .json(&InfoRequest { url })
            .send()
            .await?;

        // The body is small JSON either way, so read it before looking at the status
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let error = server_error(status, &body, INFO_FALLBACK);
            warn!(%status, "video info request failed: {error}");
            return Err(error);
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedBody(e.to_string()))
    }

    /// POST `/api/download`; resolves once the response headers arrive
    pub async fn request_download(&self, request: &DownloadRequest) -> Result<PendingFile> {
        info!(url = %request.url, format = ?request.format, quality = %request.quality, "requesting download");
        let response = self
            .client
            .post(self.endpoint("/api/download"))
            .json(request)
            .send()
            .await?;

        // Only error bodies are read here; a file body is left for `PendingFile`
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            let error = server_error(status, &body, DOWNLOAD_FALLBACK);
            warn!(%status, "download request failed: {error}");
            return Err(error);
        }

        // A header that is not valid ASCII is treated as absent
        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        debug!(?content_disposition, ?content_length, "download response received");
        Ok(PendingFile {
            response,
            content_disposition,
            content_length,
        })
    }
}

/// Error for a non-success status, preferring the body's `error` field
fn server_error(status: reqwest::StatusCode, body: &[u8], fallback: &str) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string());
    ApiError::Server { status, message }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutputFormat;

    #[tokio::test]
    async fn info_success_is_decoded() {
        let (base, _) = test_server::spawn().await;
        let info = ApiClient::new(base).fetch_info("https://video.test/ok").await.unwrap();
        assert_eq!(info.title.as_deref(), Some("Test clip"));
        assert_eq!(info.duration_label(), "2:05");
        assert_eq!(info.platform_tag(), "Youtube");
    }

    #[tokio::test]
    async fn info_error_field_becomes_message() {
        let (base, _) = test_server::spawn().await;
        let err = ApiClient::new(base)
            .fetch_info("https://video.test/broken")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported URL");
    }

    #[tokio::test]
    async fn info_without_error_field_uses_fallback() {
        let (base, _) = test_server::spawn().await;
        let err = ApiClient::new(base)
            .fetch_info("https://video.test/no-message")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), INFO_FALLBACK);
    }

    #[tokio::test]
    async fn info_with_invalid_body_is_malformed() {
        let (base, _) = test_server::spawn().await;
        let err = ApiClient::new(base)
            .fetch_info("https://video.test/not-json")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedBody(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = ApiClient::new(format!("http://{addr}"))
            .fetch_info("https://video.test/ok")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn download_exposes_disposition_and_body() {
        let (base, _) = test_server::spawn().await;
        let pending = ApiClient::new(base)
            .request_download(&DownloadRequest {
                url: "https://video.test/named".into(),
                format: OutputFormat::Video,
                quality: "best".into(),
            })
            .await
            .unwrap();
        assert_eq!(
            pending.content_disposition.as_deref(),
            Some("attachment; filename=\"clip.mp4\"")
        );
        let mut seen = 0;
        let mut body = Vec::new();
        let written = pending.write_to(&mut body, |n| seen = n).await.unwrap();
        assert_eq!(body, b"named-bytes");
        assert_eq!(written, body.len() as u64);
        assert_eq!(seen, written);
    }

    #[tokio::test]
    async fn oversized_content_length_is_not_preallocated() {
        let base = test_server::spawn_raw(
            "HTTP/1.1 200 OK\r\nContent-Length: 1099511627776\r\nConnection: close\r\n\r\nabc",
        )
        .await;
        let pending = ApiClient::new(base)
            .request_download(&DownloadRequest {
                url: "https://video.test/huge".into(),
                format: OutputFormat::Video,
                quality: "best".into(),
            })
            .await
            .unwrap();
        assert_eq!(pending.content_length, Some(1 << 40));

        // The body stops far short of the announced length
        let mut body = Vec::new();
        let err = pending.write_to(&mut body, |_| {}).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert!(body.len() <= 3);
    }

    #[tokio::test]
    async fn download_failure_without_json_uses_fallback() {
        let (base, _) = test_server::spawn().await;
        let err = ApiClient::new(base)
            .request_download(&DownloadRequest {
                url: "https://video.test/no-message".into(),
                format: OutputFormat::Audio,
                quality: "best".into(),
            })
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), DOWNLOAD_FALLBACK);
    }
}
