use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ChatError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server error: HTTP {0}")]
    Status(u16),
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
}

/// One request, one reply. Implementations must not retry.
pub(crate) trait ChatTransport: Send + Sync + 'static {
    fn send(&self, message: String) -> impl Future<Output = Result<String, ChatError>> + Send;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    response: String,
}

pub(crate) struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// `endpoint` is the service root; requests go to `{endpoint}/chat`.
    pub(crate) fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: chat_url(endpoint),
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }
}

impl ChatTransport for HttpTransport {
    async fn send(&self, message: String) -> Result<String, ChatError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&ChatRequest { message: &message })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        parse_reply(&body)
    }
}

pub(crate) fn chat_url(endpoint: &str) -> String {
    format!("{}/chat", endpoint.trim().trim_end_matches('/'))
}

pub(crate) fn parse_reply(body: &[u8]) -> Result<String, ChatError> {
    serde_json::from_slice::<ChatReply>(body)
        .map(|r| r.response)
        .map_err(|e| ChatError::Malformed(e.to_string()))
}
