//! Request and response types for the chat API

use super::TransportError;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Raw body chunks as they arrive from the network
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Conversation role on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn, projected to role/content for the request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Body of a streaming chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Prior turns, oldest first
    pub conversation_history: Vec<HistoryEntry>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, conversation_history: Vec<HistoryEntry>) -> Self {
        Self {
            message: message.into(),
            conversation_history,
        }
    }
}

/// Response head plus an optional readable body
pub struct StreamResponse {
    pub status: u16,
    pub body: Option<ByteStream>,
}

impl StreamResponse {
    pub fn new(status: u16, body: Option<ByteStream>) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Body of a non-streaming chat request
#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest<'a> {
    pub message: &'a str,
}

/// Error payload some failure responses carry
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply of the non-streaming endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default, alias = "message")]
    pub response: String,
}
