//! Session runtime
//!
//! Runs the pure state machine on a tokio task and executes its effects:
//! publishing snapshots to observers and driving chat requests.

mod executor;
mod handle;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use handle::{SendOutcome, SessionClosed, SessionHandle};
