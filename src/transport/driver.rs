//! Drives one request/response exchange
//!
//! Pumps body chunks through the frame decoder and classifier and delivers
//! the resulting events to a [`StreamHandler`] in receipt order. Exactly one
//! terminal callback (`on_complete` or `on_error`) reaches the handler per
//! exchange.

use super::classify::{classify_line, Citation, StreamEvent};
use super::frame::FrameDecoder;
use super::{ChatRequest, ChatTransport, TransportError};
use futures::StreamExt;
use std::time::Duration;

/// Receiver of stream callbacks for one exchange
pub trait StreamHandler: Send {
    fn on_delta(&mut self, text: String);

    fn on_complete(&mut self);

    fn on_error(&mut self, message: String);

    fn on_mode(&mut self, _mode: String) {}

    fn on_sources(&mut self, _sources: Vec<Citation>) {}
}

/// One-shot guard around a handler: after the first terminal callback,
/// every further callback is dropped.
struct Latched<'a, H: StreamHandler + ?Sized> {
    inner: &'a mut H,
    settled: bool,
}

impl<'a, H: StreamHandler + ?Sized> Latched<'a, H> {
    fn new(inner: &'a mut H) -> Self {
        Self {
            inner,
            settled: false,
        }
    }

    fn dispatch(&mut self, event: StreamEvent) {
        if self.settled {
            tracing::debug!(?event, "Dropping event after terminal callback");
            return;
        }
        match event {
            StreamEvent::Delta(text) => self.inner.on_delta(text),
            StreamEvent::Mode(mode) => self.inner.on_mode(mode),
            StreamEvent::Sources(sources) => self.inner.on_sources(sources),
            StreamEvent::Done => {
                self.settled = true;
                self.inner.on_complete();
            }
            StreamEvent::Error(message) => {
                self.settled = true;
                self.inner.on_error(message);
            }
        }
    }

    fn fail(&mut self, err: &TransportError) {
        self.dispatch(StreamEvent::Error(err.to_string()));
    }
}

/// Counters reported when an exchange ends
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeStats {
    pub bytes: usize,
    pub lines: usize,
    pub events: usize,
}

/// Run one exchange to completion.
///
/// `idle_timeout` bounds the wait for each body read; when it elapses the
/// exchange fails with a stall error instead of hanging.
pub async fn run_exchange<T, H>(
    transport: &T,
    request: &ChatRequest,
    handler: &mut H,
    idle_timeout: Option<Duration>,
) -> ExchangeStats
where
    T: ChatTransport + ?Sized,
    H: StreamHandler + ?Sized,
{
    let mut latch = Latched::new(handler);
    let mut stats = ExchangeStats::default();

    let response = match transport.open_stream(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open chat stream");
            latch.fail(&e);
            return stats;
        }
    };

    if !response.is_success() {
        tracing::error!(status = response.status, "Chat stream returned failure status");
        latch.fail(&TransportError::status(response.status));
        return stats;
    }

    let Some(mut body) = response.body else {
        tracing::error!(status = response.status, "Chat stream has no body");
        latch.fail(&TransportError::no_body());
        return stats;
    };

    let mut decoder = FrameDecoder::new();

    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, body.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::warn!(timeout_secs = limit.as_secs(), "Chat stream stalled");
                    latch.fail(&TransportError::timeout(format!(
                        "Stream stalled: no data received for {}s",
                        limit.as_secs()
                    )));
                    break;
                }
            },
            None => body.next().await,
        };

        match next {
            Some(Ok(chunk)) => {
                for line in decoder.push(&chunk) {
                    stats.lines += 1;
                    if let Some(event) = classify_line(&line) {
                        stats.events += 1;
                        let terminal = event.is_terminal();
                        latch.dispatch(event);
                        if terminal {
                            stats.bytes = decoder.bytes_seen();
                            return stats;
                        }
                    }
                }
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "Chat stream read failed");
                latch.fail(&e);
                break;
            }
            None => {
                stats.bytes = decoder.bytes_seen();
                if let Some(line) = decoder.finish() {
                    stats.lines += 1;
                    if let Some(event) = classify_line(&line) {
                        stats.events += 1;
                        latch.dispatch(event);
                    }
                }
                // Natural end of stream counts as completion
                latch.dispatch(StreamEvent::Done);
                return stats;
            }
        }
    }

    stats.bytes = decoder.bytes_seen();
    stats
}
