//! Transport error types

use thiserror::Error;

/// Transport failure with classification
///
/// `Display` is the human-readable message surfaced to the user as the
/// session's last error.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn status(status: u16) -> Self {
        Self::new(
            TransportErrorKind::Status(status),
            format!("HTTP error! status: {status}"),
        )
    }

    pub fn no_body() -> Self {
        Self::new(TransportErrorKind::NoBody, "No response body available")
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Protocol, message)
    }

    /// Classify a reqwest failure
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request timeout: {err}"))
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else if let Some(status) = err.status() {
            Self::status(status.as_u16())
        } else if err.is_decode() {
            Self::protocol(format!("Failed to decode response: {err}"))
        } else {
            Self::network(format!("Request failed: {err}"))
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, reset, or dropped mid-stream
    Network,
    /// No data within the configured window
    Timeout,
    /// Non-success HTTP status
    Status(u16),
    /// Response carried no readable body
    NoBody,
    /// Unparseable reply (non-streaming endpoint) or explicit error frame
    Protocol,
}
