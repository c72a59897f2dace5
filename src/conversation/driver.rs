//! Async driver: one exchange at a time through the state machine

use super::{transition, ConvEvent, ConvState, Effect, Role, TranscriptEntry, TransitionError};
use crate::client::{ChatClient, TransportError, TurnEvent, TurnStream};
use crate::decision::{format_decision, DecisionRecord, InterruptDecision};
use crate::protocol::{DraftEmail, HistoryEntry, InterruptReply};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Failures surfaced to the user-facing layer. Framing and classification
/// problems never reach here; they are absorbed inside the stream layer.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// How a driven turn settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The exchange ended with no pending decision.
    Settled,
    /// The assistant is blocked on a human decision.
    AwaitingDecision,
    /// The turn was cancelled; partial content was preserved.
    Cancelled,
}

/// Detached handle for aborting the in-flight exchange.
///
/// Safe to call at any time, from any task; cancelling an exchange that has
/// already ended is a no-op.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// One conversation with the assistant.
///
/// Owns the transcript and the per-conversation state; at most one exchange
/// is in flight at a time. All decoding, classification, and transition work
/// between stream reads is synchronous and ordering-preserving.
pub struct Conversation {
    client: ChatClient,
    user_id: String,
    chat_id: Option<String>,
    state: ConvState,
    transcript: Vec<TranscriptEntry>,
    cancel: CancellationToken,
    thinking_tx: watch::Sender<bool>,
}

enum Exchange {
    Open(String),
    Resume(InterruptReply),
}

impl Conversation {
    /// A conversation with no backend identity yet; one is allocated lazily
    /// on the first submit.
    pub fn new(client: ChatClient, user_id: impl Into<String>) -> Self {
        let (thinking_tx, _) = watch::channel(false);
        Self {
            client,
            user_id: user_id.into(),
            chat_id: None,
            state: ConvState::Idle,
            transcript: Vec::new(),
            cancel: CancellationToken::new(),
            thinking_tx,
        }
    }

    /// A conversation bound to an existing chat.
    pub fn with_chat(
        client: ChatClient,
        user_id: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        let mut conversation = Self::new(client, user_id);
        conversation.chat_id = Some(chat_id.into());
        conversation
    }

    pub fn state(&self) -> &ConvState {
        &self.state
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn pending_draft(&self) -> Option<&DraftEmail> {
        self.state.pending_draft()
    }

    pub fn is_thinking(&self) -> bool {
        self.state.is_thinking()
    }

    /// Observe the derived "thinking" flag (open turn, nothing streamed yet).
    pub fn thinking_watch(&self) -> watch::Receiver<bool> {
        self.thinking_tx.subscribe()
    }

    /// Handle for aborting the current in-flight exchange from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.cancel.clone(),
        }
    }

    /// Abort whatever is in flight and return to idle. Partial accumulated
    /// content is preserved. Idempotent.
    pub fn cancel(&mut self) {
        self.abort_to_idle();
    }

    /// Submit a fresh utterance and drive the turn until it settles, blocks
    /// on a decision, or is cancelled.
    pub async fn submit(
        &mut self,
        text: impl Into<String>,
    ) -> Result<TurnOutcome, ConversationError> {
        let effects = self.apply(ConvEvent::Submit { text: text.into() })?;
        let Some(Exchange::Open(message)) = self.execute(effects) else {
            return Ok(TurnOutcome::Settled);
        };

        let chat_id = match self.ensure_chat_id().await {
            Ok(chat_id) => chat_id,
            Err(err) => {
                self.abort_to_idle();
                return Err(err.into());
            }
        };
        let stream = match self
            .client
            .send_message(&self.user_id, &chat_id, &message, self.cancel.clone())
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                self.abort_to_idle();
                return Err(err.into());
            }
        };
        self.run_exchange(stream).await
    }

    /// Answer the pending interrupt and drive the resumed turn.
    ///
    /// Validation failures surface immediately, before any network call, and
    /// leave the decision pending.
    pub async fn respond(
        &mut self,
        decision: InterruptDecision,
    ) -> Result<TurnOutcome, ConversationError> {
        let effects = self.apply(ConvEvent::Decision { decision })?;
        let Some(Exchange::Resume(reply)) = self.execute(effects) else {
            return Ok(TurnOutcome::Settled);
        };

        let Some(chat_id) = self.chat_id.clone() else {
            self.abort_to_idle();
            return Err(TransitionError::InvalidTransition(
                "resume without a conversation identity".to_string(),
            )
            .into());
        };
        let stream = match self
            .client
            .respond_to_interrupt(&self.user_id, &chat_id, &reply, self.cancel.clone())
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                self.abort_to_idle();
                return Err(err.into());
            }
        };
        self.run_exchange(stream).await
    }

    /// Replace the transcript with the persisted history of this chat.
    pub async fn load_history(&mut self) -> Result<(), ConversationError> {
        let Some(chat_id) = self.chat_id.clone() else {
            return Ok(());
        };
        let entries = self.client.chat_history(&self.user_id, &chat_id).await?;
        self.transcript = normalize_history(entries);
        Ok(())
    }

    async fn run_exchange(
        &mut self,
        mut stream: TurnStream,
    ) -> Result<TurnOutcome, ConversationError> {
        loop {
            match stream.next_event().await {
                Ok(TurnEvent::AssistantChunk { text }) => {
                    let effects = self.apply(ConvEvent::AssistantChunk { text })?;
                    self.execute(effects);
                }
                Ok(TurnEvent::InterruptRequest { payload, draft }) => {
                    let effects = self.apply(ConvEvent::InterruptRequest { payload, draft })?;
                    self.execute(effects);
                }
                Ok(TurnEvent::Ended) => {
                    if self.cancel.is_cancelled() {
                        self.abort_to_idle();
                        return Ok(TurnOutcome::Cancelled);
                    }
                    let effects = self.apply(ConvEvent::TurnEnded)?;
                    self.execute(effects);
                    return Ok(if self.state.is_idle() {
                        TurnOutcome::Settled
                    } else {
                        TurnOutcome::AwaitingDecision
                    });
                }
                Err(err) => {
                    // The remote side aborted mid-turn. Finalize whatever
                    // streamed so far and surface the failure.
                    tracing::warn!(error = %err, "turn exchange aborted");
                    let effects = self.apply(ConvEvent::TurnEnded)?;
                    self.execute(effects);
                    return Err(err.into());
                }
            }
        }
    }

    async fn ensure_chat_id(&mut self) -> Result<String, TransportError> {
        if let Some(chat_id) = &self.chat_id {
            return Ok(chat_id.clone());
        }
        let created = self.client.create_chat(&self.user_id).await?;
        tracing::info!(chat_id = %created.chat_id, "allocated conversation");
        self.chat_id = Some(created.chat_id.clone());
        Ok(created.chat_id)
    }

    fn apply(&mut self, event: ConvEvent) -> Result<Vec<Effect>, TransitionError> {
        let result = transition(&self.state, event)?;
        self.state = result.new_state;
        self.thinking_tx.send_replace(self.state.is_thinking());
        Ok(result.effects)
    }

    fn execute(&mut self, effects: Vec<Effect>) -> Option<Exchange> {
        let mut exchange = None;
        for effect in effects {
            match effect {
                Effect::AppendUser { content } => self
                    .transcript
                    .push(TranscriptEntry::new(Role::User, content)),
                Effect::AppendAssistant { content } => self
                    .transcript
                    .push(TranscriptEntry::new(Role::Assistant, content)),
                Effect::OpenExchange { message } => exchange = Some(Exchange::Open(message)),
                Effect::ResumeExchange { reply } => exchange = Some(Exchange::Resume(reply)),
                Effect::AbortExchange => self.cancel.cancel(),
            }
        }
        exchange
    }

    fn abort_to_idle(&mut self) {
        // Cancel is valid from every state.
        if let Ok(effects) = self.apply(ConvEvent::Cancel) {
            self.execute(effects);
        }
        // A consumed token would end the next exchange immediately.
        self.cancel = CancellationToken::new();
    }
}

/// Rebuild transcript entries from persisted history.
pub fn normalize_history(entries: Vec<HistoryEntry>) -> Vec<TranscriptEntry> {
    let mut transcript = Vec::new();
    for entry in entries {
        match entry {
            HistoryEntry::User { content, timestamp } => {
                let text = match content {
                    serde_json::Value::String(text) => text,
                    other => match serde_json::from_value::<DecisionRecord>(other.clone()) {
                        Ok(record) if !record.action.is_empty() => format_decision(&record),
                        _ => serde_json::to_string_pretty(&other).unwrap_or_default(),
                    },
                };
                transcript.push(restored_entry(Role::User, text, &timestamp));
            }
            HistoryEntry::Assistant { content, timestamp } => {
                let combined = content
                    .into_iter()
                    .filter_map(|chunk| chunk.message)
                    .map(|message| message.content)
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                transcript.push(restored_entry(Role::Assistant, combined, &timestamp));
            }
        }
    }
    transcript
}

fn restored_entry(role: Role, content: String, timestamp: &str) -> TranscriptEntry {
    let mut entry = TranscriptEntry::new(role, content);
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        entry.timestamp = parsed.with_timezone(&Utc);
    }
    entry
}
