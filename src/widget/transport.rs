//! Network step of the chat widget.

use std::time::Duration;

use url::Url;

use crate::protocol::{ChatRequest, ChatResponse};

/// Path of the chat endpoint relative to the server base URL.
pub const CHAT_PATH: &str = "/api/chat";

/// Transport-level failure: the request did not produce a readable envelope.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid server URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// 2xx response whose body is not a chat envelope.
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Non-2xx response whose body is not a chat envelope.
    #[error("Unexpected response ({status}): {body}")]
    Status { status: u16, body: String },
}

/// Sends one chat request and awaits one response.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;
}

/// [`ChatTransport`] over HTTP.
///
/// # Example
///
/// ```rust,no_run
/// use gemini_chat::protocol::ChatRequest;
/// use gemini_chat::widget::{ChatTransport, HttpTransport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # use std::time::Duration;
/// let transport = HttpTransport::new("http://127.0.0.1:5000", Duration::from_secs(90))?;
/// let reply = transport.send(&ChatRequest::new("Hello!")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: Url,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the server at `base_url`; requests taking longer
    /// than `timeout` fail.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, http)
    }

    /// Create a transport with a custom reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self, TransportError> {
        let endpoint = Url::parse(base_url.as_ref())?.join(CHAT_PATH)?;
        Ok(Self { endpoint, http })
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        // The server reports its own failures with a non-2xx status and an
        // envelope; only bodies that are not an envelope are transport errors.
        match serde_json::from_slice::<ChatResponse>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(e) if status.is_success() => Err(TransportError::Decode(e)),
            Err(_) => Err(TransportError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}
