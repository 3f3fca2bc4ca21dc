//! agent_chat - streaming chat session engine
//!
//! Turns a server's incremental byte stream into a live, consistent
//! conversation transcript. Layers, bottom-up:
//!
//! - `transport`: frame decoding, event classification and the request pump
//! - `state_machine`: pure session transitions
//! - `runtime`: the serialized update loop and the handle observers use

pub mod config;
pub mod runtime;
pub mod state_machine;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use runtime::{SendOutcome, SessionClosed, SessionHandle, SessionRuntime};
pub use state_machine::{Author, SessionState, Turn, TurnId};
pub use transport::{ChatTransport, Citation, HttpTransport, LoggingTransport, TransportError};
