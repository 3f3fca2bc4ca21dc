//! Conversation session state machine
//!
//! Elm-style: a pure transition function over (state, event) that returns
//! the next state plus the effects the runtime must perform.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{Author, SessionState, Turn, TurnId};
pub use transition::{transition, TransitionError, TransitionResult, UNRESOLVED_REQUEST_MESSAGE};
