//! Conversation and interrupt state machine
//!
//! Pure state transitions in the Elm Architecture style: a transition takes
//! the current state and one event and returns the new state plus effects for
//! the driver to execute. The async driver owns exactly one network exchange
//! at a time and feeds its events through the machine in arrival order.

mod driver;
mod effect;
mod event;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use driver::{CancelHandle, Conversation, ConversationError, TurnOutcome};
pub use effect::Effect;
pub use event::ConvEvent;
pub use state::{ConvState, Role, TranscriptEntry};
pub use transition::{transition, TransitionError, TransitionResult};
