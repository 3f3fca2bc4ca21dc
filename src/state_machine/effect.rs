//! Effects produced by state transitions

use super::state::TurnId;
use crate::transport::ChatRequest;

/// I/O to perform after a transition has been applied
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open the streaming request that fills the given assistant turn
    StartRequest {
        turn_id: TurnId,
        request: ChatRequest,
    },

    /// Stop any request still filling a turn that no longer exists
    CancelRequest,

    /// Publish the new snapshot to observers
    NotifyObservers,
}

impl Effect {
    pub fn start_request(turn_id: TurnId, request: ChatRequest) -> Self {
        Effect::StartRequest { turn_id, request }
    }
}
