//! HTTP transport backed by reqwest

use super::types::{CompletionRequest, CompletionResponse, ErrorResponse};
use super::{ChatRequest, ChatTransport, StreamResponse, TransportError, TransportErrorKind};
use crate::config::ClientConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;

const STREAM_PATH: &str = "/api/chat/stream";
const COMPLETION_PATH: &str = "/api/chat";

/// Chat API client
pub struct HttpTransport {
    client: Client,
    stream_url: String,
    completion_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to create HTTP client: {e}")))?;

        let base = config.api_url.trim_end_matches('/');

        Ok(Self {
            client,
            stream_url: format!("{base}{STREAM_PATH}"),
            completion_url: format!("{base}{COMPLETION_PATH}"),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<StreamResponse, TransportError> {
        let response = self
            .client
            .post(&self.stream_url)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status().as_u16();
        let has_body = status != 204 && response.content_length() != Some(0);

        tracing::debug!(
            status,
            content_type = ?response.headers().get(reqwest::header::CONTENT_TYPE),
            has_body,
            "Stream response received"
        );

        let body = has_body.then(|| {
            let chunks = response.bytes_stream().map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| TransportError::from_reqwest(&e))
            });
            Box::pin(chunks) as super::ByteStream
        });

        Ok(StreamResponse::new(status, body))
    }

    async fn complete(&self, message: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.completion_url)
            .json(&CompletionRequest { message })
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %body, "Completion request rejected");
            return Err(status_error(status.as_u16(), &body));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| TransportError::protocol(format!("Failed to parse response: {e}")))?;

        Ok(parsed.response)
    }
}

/// Prefer the server's own `error` message over the bare status line
fn status_error(status: u16, body: &str) -> TransportError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error: Some(message),
        }) if !message.trim().is_empty() => {
            TransportError::new(TransportErrorKind::Status(status), message)
        }
        _ => TransportError::status(status),
    }
}
