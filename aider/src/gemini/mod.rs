//! Client for the Gemini `generateContent` API with bounded retries.

mod transport;
mod wire;

pub use transport::{HttpTransport, Reply, Transport, TransportError};
pub use wire::{GenerateRequest, GenerateResponse};

use std::time::Duration;

use base64::Engine;
use thiserror::Error;

use crate::backoff::BackoffPolicy;

/// Gemini API base url.
pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/";

/// Env variable holding the API credential.
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Total tries per call, including the first.
const MAX_ATTEMPTS: u32 = 5;

/// Timeout for a single HTTP round-trip; retries can make one file take
/// longer than this.
const CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The service rejected this content; distinct from "service
    /// unavailable" so callers can tell the two apart.
    #[error("request blocked by the safety layer: {reason}")]
    Blocked { reason: String },

    #[error("no generated text in API response")]
    Empty,

    #[error("failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("all {attempts} attempts failed, last error: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<GeminiError>,
    },
}

impl GeminiError {
    /// Whether another attempt could plausibly succeed. 429 and 5xx are
    /// transient; any other status means the caller configuration is wrong
    /// and retrying would only burn quota.
    pub fn is_retryable(&self) -> bool {
        match self {
            GeminiError::Transport(_) | GeminiError::Empty => true,
            GeminiError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Outcome of a single round-trip, as consumed by the retry loop.
enum Attempt {
    Success(String),
    Retryable(GeminiError),
    Fatal(GeminiError),
}

pub struct GeminiClient<T: Transport = HttpTransport> {
    transport: T,
    api_key: String,
    model: String,
    backoff: BackoffPolicy,
    max_attempts: u32,
}

impl GeminiClient<HttpTransport> {
    pub fn new(api_key: String, model: String) -> Result<Self, GeminiError> {
        let transport = HttpTransport::new(CALL_TIMEOUT)?;
        Ok(Self::with_transport(transport, api_key, model))
    }
}

impl<T: Transport> GeminiClient<T> {
    pub fn with_transport(transport: T, api_key: String, model: String) -> Self {
        Self {
            transport,
            api_key,
            model,
            backoff: BackoffPolicy::remote_default(),
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{API_BASE_URL}{}:generateContent?key={}",
            self.model, self.api_key
        )
    }

    /// Sends one instruction plus an inline media payload and returns the
    /// generated text, retrying transient failures with capped exponential
    /// backoff. Exhausting all attempts reports the last recorded failure;
    /// this never silently succeeds with empty content.
    pub async fn generate(
        &self,
        instruction: &str,
        media: &[u8],
        mime_type: &str,
    ) -> Result<String, GeminiError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(media);
        let request = GenerateRequest::inline_media(instruction, mime_type, encoded);
        let url = self.endpoint();

        let mut last_failure: Option<GeminiError> = None;
        for attempt in 0..self.max_attempts {
            match self.attempt(&url, &request).await {
                Attempt::Success(text) => return Ok(text),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Retryable(err) => {
                    if attempt + 1 < self.max_attempts {
                        let wait = self.backoff.delay(attempt);
                        tracing::warn!(
                            "attempt {}/{}: {err}; retrying in {wait:?}",
                            attempt + 1,
                            self.max_attempts,
                        );
                        tokio::time::sleep(wait).await;
                    }
                    last_failure = Some(err);
                }
            }
        }
        Err(GeminiError::RetriesExhausted {
            attempts: self.max_attempts,
            last: Box::new(last_failure.unwrap_or(GeminiError::Empty)),
        })
    }

    async fn attempt(&self, url: &str, request: &GenerateRequest) -> Attempt {
        let reply = match self.transport.send(url, request).await {
            Ok(reply) => reply,
            Err(err) => return Attempt::Retryable(GeminiError::Transport(err)),
        };

        if reply.status == 429 || reply.status >= 500 {
            return Attempt::Retryable(GeminiError::Status {
                status: reply.status,
                body: reply.body,
            });
        }
        if reply.status != 200 {
            return Attempt::Fatal(GeminiError::Status {
                status: reply.status,
                body: reply.body,
            });
        }

        let response: GenerateResponse = match serde_json::from_str(&reply.body) {
            Ok(response) => response,
            Err(err) => return Attempt::Fatal(GeminiError::Decode(err)),
        };
        if let Some(reason) = response.block_reason() {
            return Attempt::Fatal(GeminiError::Blocked {
                reason: reason.to_string(),
            });
        }
        match response.text() {
            Some(text) => Attempt::Success(text.to_string()),
            // The API can answer 200 with a structurally valid but empty
            // payload under load; treated like any transient failure.
            None => Attempt::Retryable(GeminiError::Empty),
        }
    }
}
