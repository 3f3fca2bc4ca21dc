//! Client-facing handle to a running session

use crate::state_machine::{Event, SessionState};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

/// What the loop did with a submitted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Changed,
    Unchanged,
    Rejected,
}

/// An event on its way to the session loop, with an optional reply slot
pub(crate) struct Envelope {
    pub event: Event,
    pub ack: Option<oneshot::Sender<Applied>>,
}

impl Envelope {
    pub fn new(event: Event) -> Self {
        Self { event, ack: None }
    }
}

/// Result of a send request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// A user turn was appended and a request started
    Accepted,
    /// Empty text, or a request was already in flight
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Session runtime has stopped")]
pub struct SessionClosed;

/// Cloneable handle for driving one session.
///
/// Every command is acknowledged only after the loop has applied it, so a
/// snapshot taken after `send` returns already reflects the new turns.
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::UnboundedSender<Envelope>,
    snapshot_rx: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub(crate) fn new(
        event_tx: mpsc::UnboundedSender<Envelope>,
        snapshot_rx: watch::Receiver<SessionState>,
    ) -> Self {
        Self {
            event_tx,
            snapshot_rx,
        }
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<SendOutcome, SessionClosed> {
        match self.submit(Event::user_send(text)).await? {
            Applied::Changed => Ok(SendOutcome::Accepted),
            Applied::Unchanged | Applied::Rejected => Ok(SendOutcome::Ignored),
        }
    }

    /// Empty the transcript. Anything still arriving for the old turns is
    /// discarded.
    pub async fn clear(&self) -> Result<(), SessionClosed> {
        self.submit(Event::Clear).await.map(|_| ())
    }

    pub async fn dismiss_error(&self) -> Result<(), SessionClosed> {
        self.submit(Event::DismissError).await.map(|_| ())
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionState {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that wakes on every published change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshot_rx.clone()
    }

    /// Wait until no request is in flight
    pub async fn wait_idle(&self) -> Result<SessionState, SessionClosed> {
        let mut rx = self.snapshot_rx.clone();
        let state = rx.wait_for(|s| !s.busy).await.map_err(|_| SessionClosed)?;
        Ok(state.clone())
    }

    async fn submit(&self, event: Event) -> Result<Applied, SessionClosed> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.event_tx
            .send(Envelope {
                event,
                ack: Some(ack_tx),
            })
            .map_err(|_| SessionClosed)?;
        ack_rx.await.map_err(|_| SessionClosed)
    }
}
