//! Wire types for the assistant backend
//!
//! Request and response shapes shared by the stream layer, the turn driver,
//! and the conversation state machine.

use serde::{Deserialize, Serialize};

/// Draft email attached to an interrupt, pending human approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub cc: Option<Vec<String>>,
    pub is_html: bool,
}

/// Body of the turn-open request for a fresh user utterance.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageBody {
    pub user_id: String,
    pub chat_id: String,
    pub message: String,
}

/// Action chosen by the human for a pending interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject,
    AiRewrite,
    ManualEdit,
}

impl DecisionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionAction::Approve => "approve",
            DecisionAction::Reject => "reject",
            DecisionAction::AiRewrite => "ai_rewrite",
            DecisionAction::ManualEdit => "manual_edit",
        }
    }
}

/// Resume payload for `/chats/ai/interrupt/respond`.
///
/// Optional fields are omitted from the JSON entirely rather than sent as
/// null, matching what the backend expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterruptReply {
    pub action: DecisionAction,
    pub is_html: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// One chat in the user's chat list.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSummary {
    pub chat_id: String,
    pub title: String,
    pub created_at: String,
}

/// Persisted history entry for a chat.
///
/// User entries carry either a plain string (an utterance) or a structured
/// decision record; assistant entries are stored as the list of stream chunks
/// that produced the message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum HistoryEntry {
    User {
        content: serde_json::Value,
        timestamp: String,
    },
    Assistant {
        #[serde(default)]
        content: Vec<HistoryChunk>,
        timestamp: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryChunk {
    #[serde(default)]
    pub message: Option<HistoryChunkMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryChunkMessage {
    #[serde(default)]
    pub content: String,
}

/// The history endpoint returns either a bare array or `{"messages": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    Entries(Vec<HistoryEntry>),
    Wrapped { messages: Vec<HistoryEntry> },
}

impl HistoryResponse {
    pub fn into_entries(self) -> Vec<HistoryEntry> {
        match self {
            HistoryResponse::Entries(entries) => entries,
            HistoryResponse::Wrapped { messages } => messages,
        }
    }
}

/// Response to a login request (OTP challenge issued).
#[derive(Debug, Clone, Deserialize)]
pub struct LoginAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Response to a successful OTP verification.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedLogin {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUrl {
    pub authorization_url: String,
}
