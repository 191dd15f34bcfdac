use async_trait::async_trait;
use futures::StreamExt;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Errors that can occur during a single fetch attempt.
///
/// Every failure mode of one HTTP GET maps to exactly one variant so that
/// callers (the proxy failover manager, the discovery orchestrator) can
/// branch on the kind structurally instead of matching message strings.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the caller-supplied timeout
    #[error("request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 5MB size limit
    #[error("response too large")]
    TooLarge,
}

/// A successfully retrieved HTTP response.
///
/// Only the pieces discovery needs survive: the status, the declared
/// `Content-Type` (drives the parser's format precedence), and the raw body.
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedPayload {
    /// Body as text, with invalid UTF-8 replaced. Feed XML declares its own
    /// encoding, but the sniffing path only inspects ASCII markup.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Capability interface for performing a single HTTP GET.
///
/// The orchestrator and the proxy failover manager depend on this trait, not
/// on a concrete client, so tests inject scripted doubles instead of patching
/// a process-wide fetch binding.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Performs one GET against `url`, racing it against `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, timeout expiry, non-2xx
    /// status, or an oversized body. Never partially succeeds.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPayload, FetchError>;
}

/// [`ContentFetcher`] backed by a shared [`reqwest::Client`].
///
/// Stateless between invocations; the client's connection pool is the only
/// thing reused across calls.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPayload, FetchError> {
        let response = tokio::time::timeout(timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_lowercase());

        let body = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;

        Ok(FetchedPayload {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

/// Reads a response body with a size limit using stream-based reading.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
