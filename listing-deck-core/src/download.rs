use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::contract::{AssetFetcher, Blob};
use crate::error::{FetchError, FetchResult};

/// MIME type reported when the server sends no usable `Content-Type`.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches remote assets over HTTP(S) with a shared `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Use an existing client, e.g. one shared with the design API.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Blob> {
        debug!(url = %url, "Fetching remote asset");
        let response = self.client.get(url).send().await.map_err(|e| {
            error!(url = %url, error = ?e, "Asset request failed");
            FetchError::Request {
                url: url.to_string(),
                source: e,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = %status, "Asset request returned non-success status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(essence)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

        let bytes = response.bytes().await.map_err(|e| {
            error!(url = %url, error = ?e, "Failed to read asset body");
            FetchError::Body {
                url: url.to_string(),
                source: e,
            }
        })?;

        info!(url = %url, mime_type = %mime_type, size = bytes.len(), "Fetched remote asset");
        Ok(Blob::new(mime_type, bytes.to_vec()))
    }
}

/// `image/jpeg; charset=binary` → `image/jpeg`
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one raw response on a random local port, then close the socket.
    async fn serve_raw(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(&response).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/image.jpg")
    }

    /// Serve one canned HTTP response on a random local port.
    async fn serve_once(status_line: &'static str, content_type: &'static str, body: &'static [u8]) -> String {
        let mut response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        serve_raw(response).await
    }

    #[test]
    fn essence_strips_parameters() {
        assert_eq!(essence("image/JPEG; charset=binary"), "image/jpeg");
        assert_eq!(essence("image/png"), "image/png");
    }

    #[tokio::test]
    async fn fetch_returns_body_and_content_type() {
        let url = serve_once("200 OK", "image/jpeg", b"\xff\xd8\xff\xe0jpeg").await;
        let fetcher = HttpFetcher::new().unwrap();

        let blob = fetcher.fetch(&url).await.expect("fetch should succeed");

        assert_eq!(blob.mime_type, "image/jpeg");
        assert_eq!(blob.bytes, b"\xff\xd8\xff\xe0jpeg".to_vec());
    }

    #[tokio::test]
    async fn fetch_fails_on_non_success_status() {
        let url = serve_once("404 Not Found", "text/plain", b"missing").await;
        let fetcher = HttpFetcher::new().unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();

        assert!(
            matches!(err, FetchError::Status { status: 404, .. }),
            "expected a 404 status error, got {err:?}"
        );
    }

    #[tokio::test]
    async fn fetch_fails_when_nothing_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let fetcher = HttpFetcher::new().unwrap();

        let err = fetcher.fetch(&format!("http://{addr}/gone.jpg")).await.unwrap_err();

        assert!(matches!(err, FetchError::Request { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn fetch_fails_when_body_is_cut_short() {
        let url = serve_raw(
            b"HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: 100\r\nConnection: close\r\n\r\npart"
                .to_vec(),
        )
        .await;
        let fetcher = HttpFetcher::new().unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::Body { .. }), "got {err:?}");
    }
}
