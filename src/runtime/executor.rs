//! Session runtime executor
//!
//! Owns the canonical `SessionState`. User commands and transport callbacks
//! arrive on one unbounded queue and are applied one at a time through the
//! pure transition function, so concurrent deltas can never interleave with
//! each other or with a clear.

use super::handle::{Applied, Envelope, SessionHandle};
use crate::state_machine::{transition, Effect, Event, SessionState, TurnId};
use crate::transport::{run_exchange, ChatRequest, ChatTransport, Citation, StreamHandler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Single-session event loop
pub struct SessionRuntime {
    transport: Arc<dyn ChatTransport>,
    idle_timeout: Option<Duration>,
    event_rx: mpsc::UnboundedReceiver<Envelope>,
    /// Weak so the loop ends once every handle and request task is gone
    event_tx: mpsc::WeakUnboundedSender<Envelope>,
    /// Holds the canonical state; receivers see it after each notify
    snapshot_tx: watch::Sender<SessionState>,
    /// Token for the request filling the current in-progress turn
    request_cancel: Option<(TurnId, CancellationToken)>,
}

impl SessionRuntime {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        idle_timeout: Option<Duration>,
    ) -> (Self, SessionHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionState::new());

        let runtime = Self {
            transport,
            idle_timeout,
            event_rx,
            event_tx: event_tx.downgrade(),
            snapshot_tx,
            request_cancel: None,
        };
        let handle = SessionHandle::new(event_tx, snapshot_rx);
        (runtime, handle)
    }

    /// Start the loop on the current tokio runtime
    pub fn spawn(transport: Arc<dyn ChatTransport>, idle_timeout: Option<Duration>) -> SessionHandle {
        let (runtime, handle) = Self::new(transport, idle_timeout);
        tokio::spawn(runtime.run());
        handle
    }

    pub async fn run(mut self) {
        tracing::info!("Starting session runtime");

        while let Some(envelope) = self.event_rx.recv().await {
            self.process_event(envelope);
        }

        tracing::info!("Session runtime stopped");
    }

    fn process_event(&mut self, envelope: Envelope) {
        let Envelope { event, ack } = envelope;
        let event_name = event.name();

        if let Event::RequestSettled { turn_id } = &event {
            if self
                .request_cancel
                .as_ref()
                .is_some_and(|(active, _)| active == turn_id)
            {
                self.request_cancel = None;
            }
        }

        let outcome = transition(&self.snapshot_tx.borrow(), event);
        let applied = match outcome {
            Ok(result) if result.is_noop() => {
                tracing::trace!(event = event_name, "Event left state unchanged");
                Applied::Unchanged
            }
            Ok(result) => {
                // Every state change carries NotifyObservers, so the new
                // state is moved into the channel rather than copied
                if result.effects.contains(&Effect::NotifyObservers) {
                    self.snapshot_tx.send_replace(result.new_state);
                }
                for effect in result.effects {
                    self.execute_effect(effect);
                }
                Applied::Changed
            }
            Err(e) => {
                // Rejected sends are dropped silently; the caller sees `Ignored`
                tracing::debug!(event = event_name, reason = %e, "Event rejected");
                Applied::Rejected
            }
        };

        if let Some(ack) = ack {
            let _ = ack.send(applied);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            // Published together with the state in process_event
            Effect::NotifyObservers => {}
            Effect::StartRequest { turn_id, request } => {
                self.start_request(turn_id, request);
            }
            Effect::CancelRequest => {
                if let Some((turn_id, token)) = self.request_cancel.take() {
                    tracing::info!(turn_id = %turn_id, "Cancelling chat request");
                    token.cancel();
                }
            }
        }
    }

    /// Run the exchange on its own task. A supervising task reports
    /// `RequestSettled` once it exits, even if it panicked, so a send can
    /// never leave the session busy.
    fn start_request(&mut self, turn_id: TurnId, request: ChatRequest) {
        let Some(event_tx) = self.event_tx.upgrade() else {
            tracing::warn!(turn_id = %turn_id, "No handles left, not starting request");
            return;
        };

        tracing::info!(
            turn_id = %turn_id,
            history_len = request.conversation_history.len(),
            "Starting chat request"
        );

        let cancel_token = CancellationToken::new();
        if let Some((_, stale)) = self
            .request_cancel
            .replace((turn_id.clone(), cancel_token.clone()))
        {
            stale.cancel();
        }

        let transport = Arc::clone(&self.transport);
        let idle_timeout = self.idle_timeout;
        let settle_tx = event_tx.clone();
        let settle_id = turn_id.clone();

        let exchange = tokio::spawn(async move {
            let mut sink = TurnEventSink {
                turn_id: turn_id.clone(),
                tx: event_tx,
            };
            // Race the exchange against cancellation; dropping it closes the body
            tokio::select! {
                biased;

                () = cancel_token.cancelled() => {
                    tracing::info!(turn_id = %turn_id, "Chat request cancelled");
                }

                stats = run_exchange(transport.as_ref(), &request, &mut sink, idle_timeout) => {
                    tracing::info!(
                        turn_id = %turn_id,
                        bytes = stats.bytes,
                        lines = stats.lines,
                        events = stats.events,
                        "Chat request finished"
                    );
                }
            }
        });

        tokio::spawn(async move {
            if let Err(e) = exchange.await {
                tracing::error!(turn_id = %settle_id, error = %e, "Chat request task aborted");
            }
            let _ = settle_tx.send(Envelope::new(Event::RequestSettled { turn_id: settle_id }));
        });
    }
}

/// Forwards stream callbacks into the session queue, tagged with the
/// assistant turn they fill
struct TurnEventSink {
    turn_id: TurnId,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl TurnEventSink {
    fn forward(&self, event: Event) {
        if self.tx.send(Envelope::new(event)).is_err() {
            tracing::debug!(turn_id = %self.turn_id, "Session gone, dropping stream event");
        }
    }
}

impl StreamHandler for TurnEventSink {
    fn on_delta(&mut self, text: String) {
        self.forward(Event::Delta {
            turn_id: self.turn_id.clone(),
            text,
        });
    }

    fn on_complete(&mut self) {
        self.forward(Event::Completed {
            turn_id: self.turn_id.clone(),
        });
    }

    fn on_error(&mut self, message: String) {
        self.forward(Event::Failed {
            turn_id: self.turn_id.clone(),
            message,
        });
    }

    fn on_mode(&mut self, mode: String) {
        self.forward(Event::Mode {
            turn_id: self.turn_id.clone(),
            mode,
        });
    }

    fn on_sources(&mut self, citations: Vec<Citation>) {
        self.forward(Event::Sources {
            turn_id: self.turn_id.clone(),
            citations,
        });
    }
}
