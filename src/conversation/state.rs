//! Conversation state and transcript types

use crate::protocol::DraftEmail;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-conversation state.
///
/// At most one turn is open at any time; the accumulating assistant message
/// lives inside the open turn and is finalized into the transcript when the
/// turn closes or is interrupted.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConvState {
    /// Ready for user input, no exchange in flight.
    #[default]
    Idle,

    /// A turn is open and streaming. `message` is `None` until the first
    /// assistant chunk of the turn arrives.
    TurnOpen { message: Option<String> },

    /// The turn is blocked on a human decision about a drafted email.
    AwaitingDecision {
        payload: String,
        draft: DraftEmail,
    },
}

impl ConvState {
    /// Derived UI flag: a turn is open but nothing has streamed yet.
    pub fn is_thinking(&self) -> bool {
        matches!(self, ConvState::TurnOpen { message: None })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConvState::Idle)
    }

    pub fn pending_draft(&self) -> Option<&DraftEmail> {
        match self {
            ConvState::AwaitingDecision { draft, .. } => Some(draft),
            _ => None,
        }
    }
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One finalized entry in the visible transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}
