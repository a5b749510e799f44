use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::wire::GenerateRequest;

/// One finished HTTP round-trip: the remote side answered with some status
/// and body. Transport failures never produce a `Reply`.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Injectable HTTP seam so the retry loop can be driven by a scripted stub
/// in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, request: &GenerateRequest)
        -> Result<Reply, TransportError>;
}

/// reqwest-backed transport with a fixed per-call timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        url: &str,
        request: &GenerateRequest,
    ) -> Result<Reply, TransportError> {
        // The request struct is serialized freshly here on every attempt, so
        // no body buffer is ever reused across retries.
        let response = self.client.post(url).json(request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(Reply { status, body })
    }
}
