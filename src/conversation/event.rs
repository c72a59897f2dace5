//! Events that drive conversation transitions

use crate::decision::InterruptDecision;
use crate::protocol::DraftEmail;

/// Everything that can happen to a conversation: user input, classified
/// stream events from the open exchange, and cancellation.
#[derive(Debug, Clone)]
pub enum ConvEvent {
    /// The user submitted a fresh utterance.
    Submit { text: String },

    /// A fragment of assistant content arrived on the open exchange.
    AssistantChunk { text: String },

    /// The assistant paused for a human decision about a drafted email.
    InterruptRequest { payload: String, draft: DraftEmail },

    /// The open exchange ended without error.
    TurnEnded,

    /// The user answered a pending interrupt.
    Decision { decision: InterruptDecision },

    /// The user aborted whatever is in flight.
    Cancel,
}
