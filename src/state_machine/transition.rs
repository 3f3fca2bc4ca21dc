//! Pure state transition function
//!
//! Every mutation of the session is a function of (previous state, event).
//! Transport events are keyed by assistant turn id: an event for a turn that
//! is missing or already resolved leaves the state untouched, which is what
//! makes completion and error resolve a send at most once and keeps late
//! callbacks from resurrecting turns removed by `Clear`.

use super::state::{SessionState, Turn, TurnId};
use super::{Effect, Event};
use crate::transport::ChatRequest;
use thiserror::Error;

/// Message recorded when a request task exits without a terminal event
pub const UNRESOLVED_REQUEST_MESSAGE: &str = "Request ended without a response";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// State is unchanged and nothing needs to happen
    pub fn unchanged(state: &SessionState) -> Self {
        Self::new(state.clone())
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Sends rejected locally. These are dropped silently, never shown to the user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is still streaming, cannot accept message")]
    Busy,
}

/// Pure transition function
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::UserSend {
            text,
            user_turn_id,
            assistant_turn_id,
            created_at,
        } => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            if state.busy {
                return Err(TransitionError::Busy);
            }

            let history = state.history();
            let mut next = state.clone();
            next.turns.push(Turn::user(user_turn_id, text, created_at));
            next.turns
                .push(Turn::assistant_placeholder(assistant_turn_id.clone(), created_at));
            next.busy = true;
            next.last_error = None;

            Ok(TransitionResult::new(next)
                .with_effect(Effect::NotifyObservers)
                .with_effect(Effect::start_request(
                    assistant_turn_id,
                    ChatRequest::new(text, history),
                )))
        }

        Event::Clear => Ok(TransitionResult::new(SessionState::new())
            .with_effect(Effect::CancelRequest)
            .with_effect(Effect::NotifyObservers)),

        Event::DismissError => {
            if state.last_error.is_none() {
                return Ok(TransitionResult::unchanged(state));
            }
            let mut next = state.clone();
            next.last_error = None;
            Ok(TransitionResult::new(next).with_effect(Effect::NotifyObservers))
        }

        Event::Delta { turn_id, text } => Ok(update_in_progress(state, &turn_id, |turn| {
            if text.is_empty() {
                return false;
            }
            turn.text.push_str(&text);
            true
        })),

        Event::Mode { turn_id, mode } => Ok(update_in_progress(state, &turn_id, |turn| {
            if turn.mode.is_some() {
                return false;
            }
            turn.mode = Some(mode);
            true
        })),

        Event::Sources { turn_id, citations } => {
            Ok(update_in_progress(state, &turn_id, |turn| {
                if turn.citations.is_some() {
                    return false;
                }
                turn.citations = Some(citations);
                true
            }))
        }

        Event::Completed { turn_id } => {
            if !is_in_progress(state, &turn_id) {
                return Ok(TransitionResult::unchanged(state));
            }
            let mut next = state.clone();
            if let Some(turn) = next.turn_mut(&turn_id) {
                turn.in_progress = false;
            }
            next.busy = false;
            Ok(TransitionResult::new(next).with_effect(Effect::NotifyObservers))
        }

        Event::Failed { turn_id, message } => Ok(fail_turn(state, &turn_id, message)),

        Event::RequestSettled { turn_id } => Ok(fail_turn(
            state,
            &turn_id,
            UNRESOLVED_REQUEST_MESSAGE.to_string(),
        )),
    }
}

fn is_in_progress(state: &SessionState, turn_id: &TurnId) -> bool {
    state.turn(turn_id).is_some_and(|t| t.in_progress)
}

/// Apply `update` to the in-progress turn with this id. `update` returns
/// whether it changed anything.
fn update_in_progress<F>(state: &SessionState, turn_id: &TurnId, update: F) -> TransitionResult
where
    F: FnOnce(&mut Turn) -> bool,
{
    if !is_in_progress(state, turn_id) {
        return TransitionResult::unchanged(state);
    }
    let mut next = state.clone();
    let changed = next.turn_mut(turn_id).is_some_and(update);
    if changed {
        TransitionResult::new(next).with_effect(Effect::NotifyObservers)
    } else {
        TransitionResult::unchanged(state)
    }
}

/// Drop the placeholder and record the error, if the turn is still open
fn fail_turn(state: &SessionState, turn_id: &TurnId, message: String) -> TransitionResult {
    if !is_in_progress(state, turn_id) {
        return TransitionResult::unchanged(state);
    }
    let mut next = state.clone();
    next.turns.retain(|t| &t.id != turn_id);
    next.busy = false;
    next.last_error = Some(message);
    TransitionResult::new(next).with_effect(Effect::NotifyObservers)
}
