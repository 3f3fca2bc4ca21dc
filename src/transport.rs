//! Chat API transport
//!
//! Turns the assistant's chunked streaming response into typed events.
//! The transport itself is a trait so the session runtime can be driven by
//! a real HTTP client or by a scripted fake.

mod classify;
mod driver;
mod error;
mod frame;
mod http;
mod types;

#[cfg(test)]
mod proptests;

pub use classify::{classify_line, Citation, StreamEvent, DONE_SENTINEL};
pub use driver::{run_exchange, ExchangeStats, StreamHandler};
pub use error::{TransportError, TransportErrorKind};
pub use frame::FrameDecoder;
pub use http::HttpTransport;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for chat backends
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Issue one streaming request. A failure status is reported through
    /// `StreamResponse::status`, not as an error.
    async fn open_stream(&self, request: &ChatRequest) -> Result<StreamResponse, TransportError>;

    /// Non-streaming fallback: send a single message, get the full reply
    async fn complete(&self, message: &str) -> Result<String, TransportError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn open_stream(&self, request: &ChatRequest) -> Result<StreamResponse, TransportError> {
        (**self).open_stream(request).await
    }

    async fn complete(&self, message: &str) -> Result<String, TransportError> {
        (**self).complete(message).await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport {
    inner: Arc<dyn ChatTransport>,
}

impl LoggingTransport {
    pub fn new(inner: Arc<dyn ChatTransport>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ChatTransport for LoggingTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<StreamResponse, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.open_stream(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    status = response.status,
                    history_len = request.conversation_history.len(),
                    "Chat stream opened"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Chat stream request failed"
                );
            }
        }

        result
    }

    async fn complete(&self, message: &str) -> Result<String, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(message).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    reply_len = reply.len(),
                    "Chat completion finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    "Chat completion failed"
                );
            }
        }

        result
    }
}
