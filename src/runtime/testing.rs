//! Mock implementations for testing
//!
//! Scripted transports and a recording stream handler, so the driver and
//! the session runtime can be exercised without a server.

use crate::transport::{
    ByteStream, ChatRequest, ChatTransport, Citation, StreamHandler, StreamResponse, TransportError,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock Transport
// ============================================================================

/// One step of a scripted response body
enum Step {
    Chunk(Vec<u8>),
    Fail(TransportError),
    /// Wait until the test releases the gate
    Wait(Arc<Notify>),
    /// Never yield again
    Stall,
}

enum Script {
    Stream { status: u16, steps: Vec<Step> },
    NoBody,
    OpenError(TransportError),
}

/// Transport that replays queued scripts, one per request
pub struct MockTransport {
    streams: Mutex<VecDeque<Script>>,
    completions: Mutex<VecDeque<Result<String, TransportError>>>,
    /// Record of all streaming requests made
    pub requests: Mutex<Vec<ChatRequest>>,
    /// Record of all completion messages sent
    pub messages: Mutex<Vec<String>>,
    open_bodies: Arc<()>,
}

fn chunk_steps(chunks: &[&str]) -> Vec<Step> {
    chunks
        .iter()
        .map(|c| Step::Chunk(c.as_bytes().to_vec()))
        .collect()
}

/// `guard` lives as long as the stream, so open bodies can be counted
fn body_stream(steps: Vec<Step>, guard: Arc<()>) -> ByteStream {
    Box::pin(futures::stream::unfold(
        (steps.into_iter(), guard),
        |(mut steps, guard)| async move {
            loop {
                let Some(step) = steps.next() else {
                    return None;
                };
                match step {
                    Step::Chunk(bytes) => return Some((Ok(bytes), (steps, guard))),
                    Step::Fail(e) => return Some((Err(e), (steps, guard))),
                    Step::Wait(gate) => gate.notified().await,
                    Step::Stall => futures::future::pending::<()>().await,
                }
            }
        },
    ))
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(VecDeque::new()),
            completions: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            open_bodies: Arc::new(()),
        }
    }

    fn push(&self, script: Script) {
        self.streams.lock().unwrap().push_back(script);
    }

    /// Queue a 200 response whose body yields these chunks, then ends
    pub fn queue_chunks(&self, chunks: &[&str]) {
        self.queue_status(200, chunks);
    }

    pub fn queue_status(&self, status: u16, chunks: &[&str]) {
        self.push(Script::Stream {
            status,
            steps: chunk_steps(chunks),
        });
    }

    pub fn queue_no_body(&self) {
        self.push(Script::NoBody);
    }

    /// Queue a failure to even open the stream
    pub fn queue_open_error(&self, error: TransportError) {
        self.push(Script::OpenError(error));
    }

    /// Queue a body that breaks with a read error after the chunks
    pub fn queue_chunks_then_error(&self, chunks: &[&str], error: TransportError) {
        let mut steps = chunk_steps(chunks);
        steps.push(Step::Fail(error));
        self.push(Script::Stream { status: 200, steps });
    }

    /// Queue a body that goes silent forever after the chunks
    pub fn queue_stalled(&self, chunks: &[&str]) {
        let mut steps = chunk_steps(chunks);
        steps.push(Step::Stall);
        self.push(Script::Stream { status: 200, steps });
    }

    /// Queue a body that pauses between `before` and `after` until the
    /// returned gate is notified
    pub fn queue_gated(&self, before: &[&str], after: &[&str]) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        let mut steps = chunk_steps(before);
        steps.push(Step::Wait(Arc::clone(&gate)));
        steps.extend(chunk_steps(after));
        self.push(Script::Stream { status: 200, steps });
        gate
    }

    pub fn queue_completion(&self, result: Result<String, TransportError>) {
        self.completions.lock().unwrap().push_back(result);
    }

    /// Get recorded streaming requests
    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn recorded_messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Response bodies handed out and not yet dropped
    pub fn open_bodies(&self) -> usize {
        Arc::strong_count(&self.open_bodies) - 1
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<StreamResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.streams.lock().unwrap().pop_front();
        match script {
            Some(Script::Stream { status, steps }) => {
                let body = body_stream(steps, Arc::clone(&self.open_bodies));
                Ok(StreamResponse::new(status, Some(body)))
            }
            Some(Script::NoBody) => Ok(StreamResponse::new(200, None)),
            Some(Script::OpenError(e)) => Err(e),
            None => Err(TransportError::network("No mock response queued")),
        }
    }

    async fn complete(&self, message: &str) -> Result<String, TransportError> {
        self.messages.lock().unwrap().push(message.to_string());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("No mock response queued")))
    }
}

/// Transport whose request task panics, for cleanup tests
pub struct PanickingTransport;

#[async_trait]
impl ChatTransport for PanickingTransport {
    async fn open_stream(&self, _request: &ChatRequest) -> Result<StreamResponse, TransportError> {
        panic!("transport exploded");
    }

    async fn complete(&self, _message: &str) -> Result<String, TransportError> {
        panic!("transport exploded");
    }
}

// ============================================================================
// Recording Handler
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Delta(String),
    Mode(String),
    Sources(Vec<Citation>),
    Complete,
    Error(String),
}

/// Stream handler that records every callback in order
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub calls: Vec<Recorded>,
}

impl RecordingHandler {
    pub fn completions(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Recorded::Complete))
            .count()
    }

    pub fn errors(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Recorded::Error(_)))
            .count()
    }
}

impl StreamHandler for RecordingHandler {
    fn on_delta(&mut self, text: String) {
        self.calls.push(Recorded::Delta(text));
    }

    fn on_complete(&mut self) {
        self.calls.push(Recorded::Complete);
    }

    fn on_error(&mut self, message: String) {
        self.calls.push(Recorded::Error(message));
    }

    fn on_mode(&mut self, mode: String) {
        self.calls.push(Recorded::Mode(mode));
    }

    fn on_sources(&mut self, citations: Vec<Citation>) {
        self.calls.push(Recorded::Sources(citations));
    }
}
