//! Effects produced by conversation transitions

use crate::protocol::InterruptReply;

/// Effects to be executed by the driver after a state transition.
///
/// Transitions stay pure; everything that touches the transcript or the
/// network is described here and run by [`super::Conversation`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Record a user-authored transcript entry (an utterance or a rendered
    /// decision summary).
    AppendUser { content: String },

    /// Finalize accumulated assistant content into the transcript.
    AppendAssistant { content: String },

    /// Open a fresh exchange carrying a user utterance.
    OpenExchange { message: String },

    /// Open a resume exchange carrying an encoded interrupt decision.
    ResumeExchange { reply: InterruptReply },

    /// Abort the in-flight exchange, if any.
    AbortExchange,
}
