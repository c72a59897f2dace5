//! Classification of decoded records into application events

use crate::protocol::DraftEmail;
use serde::Deserialize;

/// A record classified into a known application-level meaning.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of assistant-authored content for the current message.
    AssistantChunk { text: String },
    /// The assistant is blocked on a human decision about a drafted email.
    InterruptRequest { payload: String, draft: DraftEmail },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePayload {
    Message { message: WireMessage },
    Interrupt {
        payload: String,
        draft_email: DraftEmail,
    },
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    #[allow(dead_code)] // Present on the wire; only content matters here.
    role: String,
    content: String,
}

/// Classify one decoded record.
///
/// Malformed payloads and unrecognized type tags yield `None` rather than an
/// error: the server may emit event kinds this client does not yet understand,
/// and they must not break the stream.
pub fn classify(record: &str) -> Option<StreamEvent> {
    match serde_json::from_str::<WirePayload>(record) {
        Ok(WirePayload::Message { message }) => Some(StreamEvent::AssistantChunk {
            text: message.content,
        }),
        Ok(WirePayload::Interrupt {
            payload,
            draft_email,
        }) => Some(StreamEvent::InterruptRequest {
            payload,
            draft: draft_email,
        }),
        Err(err) => {
            tracing::debug!(%err, record, "dropping unrecognized stream record");
            None
        }
    }
}
