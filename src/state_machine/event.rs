//! Events that can change session state

use super::state::TurnId;
use crate::transport::Citation;
use chrono::{DateTime, Utc};

/// Inputs to the session transition function.
///
/// User commands and transport callbacks share this one type so that every
/// mutation flows through the same serialized queue. Transport events carry
/// the id of the assistant turn they belong to; events for a turn that no
/// longer exists are ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User commands
    UserSend {
        text: String,
        /// Ids and timestamp are chosen by the caller so the transition stays pure
        user_turn_id: TurnId,
        assistant_turn_id: TurnId,
        created_at: DateTime<Utc>,
    },
    Clear,
    DismissError,

    // Transport events
    Delta {
        turn_id: TurnId,
        text: String,
    },
    Mode {
        turn_id: TurnId,
        mode: String,
    },
    Sources {
        turn_id: TurnId,
        citations: Vec<Citation>,
    },
    Completed {
        turn_id: TurnId,
    },
    Failed {
        turn_id: TurnId,
        message: String,
    },
    /// The request task for this turn has exited, however it ended
    RequestSettled {
        turn_id: TurnId,
    },
}

impl Event {
    /// Build a send event with fresh ids
    pub fn user_send(text: impl Into<String>) -> Self {
        Event::UserSend {
            text: text.into(),
            user_turn_id: TurnId::generate(),
            assistant_turn_id: TurnId::generate(),
            created_at: Utc::now(),
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserSend { .. } => "user_send",
            Event::Clear => "clear",
            Event::DismissError => "dismiss_error",
            Event::Delta { .. } => "delta",
            Event::Mode { .. } => "mode",
            Event::Sources { .. } => "sources",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::RequestSettled { .. } => "request_settled",
        }
    }
}
