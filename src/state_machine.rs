//! Conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions. The
//! runtime feeds events in, executes the returned effects, and feeds store
//! replies back in as further events.

mod effect;
pub mod event;
pub mod prompts;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{ButtonSet, Effect};
pub use event::{Button, Command, Event};
pub use state::{GradeSlot, Session, SessionContext, SessionState, UserId};
pub use transition::transition;
