//! Human decisions for pending interrupts
//!
//! Validation, encoding into the resume payload, and the deterministic
//! transcript summary. Validation runs before anything touches the network;
//! a failed decision never leaves the `AwaitingDecision` state.

use crate::protocol::{DecisionAction, InterruptReply};
use serde::Deserialize;
use thiserror::Error;

/// A decision entered by the human for a pending interrupt.
///
/// Constructed once per decision round, encoded into an [`InterruptReply`],
/// then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptDecision {
    /// Send the drafted email as-is.
    Approve { is_html: bool },
    /// Discard the draft.
    Reject { is_html: bool },
    /// Ask the assistant to rewrite the draft following instructions.
    AiRewrite { instructions: String, is_html: bool },
    /// Replace the draft fields wholesale.
    ManualEdit {
        to: Vec<String>,
        cc: Vec<String>,
        subject: String,
        body: String,
        is_html: bool,
    },
}

/// Field-level validation failure for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("instructions are required for an AI rewrite")]
    MissingInstructions,
    #[error("at least one recipient is required")]
    MissingRecipients,
    #[error("subject must not be empty")]
    MissingSubject,
    #[error("body must not be empty")]
    MissingBody,
}

impl InterruptDecision {
    pub fn action(&self) -> DecisionAction {
        match self {
            InterruptDecision::Approve { .. } => DecisionAction::Approve,
            InterruptDecision::Reject { .. } => DecisionAction::Reject,
            InterruptDecision::AiRewrite { .. } => DecisionAction::AiRewrite,
            InterruptDecision::ManualEdit { .. } => DecisionAction::ManualEdit,
        }
    }

    /// Check the action-specific required fields.
    pub fn validate(&self) -> Result<(), DecisionError> {
        match self {
            InterruptDecision::Approve { .. } | InterruptDecision::Reject { .. } => Ok(()),
            InterruptDecision::AiRewrite { instructions, .. } => {
                if instructions.trim().is_empty() {
                    Err(DecisionError::MissingInstructions)
                } else {
                    Ok(())
                }
            }
            InterruptDecision::ManualEdit {
                to, subject, body, ..
            } => {
                if to.iter().all(|addr| addr.trim().is_empty()) {
                    Err(DecisionError::MissingRecipients)
                } else if subject.trim().is_empty() {
                    Err(DecisionError::MissingSubject)
                } else if body.trim().is_empty() {
                    Err(DecisionError::MissingBody)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Encode into the resume payload. Only the fields relevant to the chosen
    /// action are carried.
    pub fn to_reply(&self) -> InterruptReply {
        let mut reply = InterruptReply {
            action: self.action(),
            is_html: match *self {
                InterruptDecision::Approve { is_html }
                | InterruptDecision::Reject { is_html }
                | InterruptDecision::AiRewrite { is_html, .. }
                | InterruptDecision::ManualEdit { is_html, .. } => is_html,
            },
            to: None,
            subject: None,
            body: None,
            cc: None,
            instructions: None,
        };
        match self {
            InterruptDecision::Approve { .. } | InterruptDecision::Reject { .. } => {}
            InterruptDecision::AiRewrite { instructions, .. } => {
                reply.instructions = Some(instructions.trim().to_string());
            }
            InterruptDecision::ManualEdit {
                to,
                cc,
                subject,
                body,
                ..
            } => {
                reply.to = Some(clean_addresses(to));
                reply.cc = Some(clean_addresses(cc));
                reply.subject = Some(subject.trim().to_string());
                reply.body = Some(body.clone());
            }
        }
        reply
    }

    /// Deterministic human-readable summary recorded in the transcript.
    pub fn summary(&self) -> String {
        let record = match self {
            InterruptDecision::Approve { is_html } | InterruptDecision::Reject { is_html } => {
                DecisionRecord {
                    action: self.action().as_str().to_string(),
                    is_html: Some(*is_html),
                    ..DecisionRecord::default()
                }
            }
            InterruptDecision::AiRewrite {
                instructions,
                is_html,
            } => DecisionRecord {
                action: self.action().as_str().to_string(),
                instructions: Some(instructions.trim().to_string()),
                is_html: Some(*is_html),
                ..DecisionRecord::default()
            },
            InterruptDecision::ManualEdit {
                to,
                cc,
                subject,
                body,
                is_html,
            } => DecisionRecord {
                action: self.action().as_str().to_string(),
                to: clean_addresses(to),
                cc: clean_addresses(cc),
                subject: Some(subject.trim().to_string()),
                body: Some(body.clone()),
                instructions: None,
                is_html: Some(*is_html),
            },
        };
        format_decision(&record)
    }
}

fn clean_addresses(addresses: &[String]) -> Vec<String> {
    addresses
        .iter()
        .map(|addr| addr.trim())
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

/// A decision as persisted in chat history: a loose record with an action tag
/// and whichever fields the action carried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DecisionRecord {
    pub action: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub is_html: Option<bool>,
}

/// Render a decision record as transcript text.
///
/// Always starts with `Decision: <action>`. Approve and reject carry nothing
/// else; an AI rewrite carries its instructions; anything else renders the
/// email fields that are present, with the body last and verbatim.
pub fn format_decision(record: &DecisionRecord) -> String {
    let mut lines = vec![format!("Decision: {}", record.action)];

    match record.action.as_str() {
        "approve" | "reject" => return lines.join("\n"),
        "ai_rewrite" => {
            if let Some(instructions) = &record.instructions {
                if !instructions.is_empty() {
                    lines.push(format!("Instructions: {instructions}"));
                }
            }
            return lines.join("\n");
        }
        _ => {}
    }

    if !record.to.is_empty() {
        lines.push(format!("To: {}", record.to.join(", ")));
    }
    if !record.cc.is_empty() {
        lines.push(format!("CC: {}", record.cc.join(", ")));
    }
    if let Some(subject) = &record.subject {
        if !subject.is_empty() {
            lines.push(format!("Subject: {subject}"));
        }
    }
    if let Some(is_html) = record.is_html {
        lines.push(format!("HTML: {}", if is_html { "yes" } else { "no" }));
    }
    if let Some(instructions) = &record.instructions {
        if !instructions.trim().is_empty() {
            lines.push(format!("Instructions: {instructions}"));
        }
    }
    if let Some(body) = &record.body {
        if !body.is_empty() {
            lines.push("Body:".to_string());
            lines.push(body.clone());
        }
    }
    lines.join("\n")
}
