//! Pure state transition function

use super::{ConvEvent, ConvState, Effect};
use crate::decision::DecisionError;
use thiserror::Error;

/// Result of a state transition.
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during a transition. The state is unchanged whenever
/// one of these is returned.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("a turn is already in flight for this conversation")]
    TurnInFlight,
    #[error("no interrupt is pending a decision")]
    NoPendingDecision,
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function: same inputs, same outputs, no I/O.
pub fn transition(
    state: &ConvState,
    event: ConvEvent,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submitting an utterance
        // ============================================================
        (ConvState::Idle, ConvEvent::Submit { text }) => {
            Ok(TransitionResult::new(ConvState::TurnOpen { message: None })
                .with_effect(Effect::AppendUser {
                    content: text.clone(),
                })
                .with_effect(Effect::OpenExchange { message: text }))
        }

        // At most one open turn per conversation.
        (
            ConvState::TurnOpen { .. } | ConvState::AwaitingDecision { .. },
            ConvEvent::Submit { .. },
        ) => Err(TransitionError::TurnInFlight),

        // ============================================================
        // Streamed assistant output
        // ============================================================
        (ConvState::TurnOpen { message }, ConvEvent::AssistantChunk { text }) => {
            let joined = match message {
                Some(prev) => format!("{prev}\n\n{text}"),
                None => text,
            };
            Ok(TransitionResult::new(ConvState::TurnOpen {
                message: Some(joined),
            }))
        }

        (ConvState::TurnOpen { message }, ConvEvent::InterruptRequest { payload, draft }) => {
            let mut result =
                TransitionResult::new(ConvState::AwaitingDecision { payload, draft });
            if let Some(content) = message {
                result = result.with_effect(Effect::AppendAssistant {
                    content: content.clone(),
                });
            }
            Ok(result)
        }

        (ConvState::TurnOpen { message }, ConvEvent::TurnEnded) => {
            let mut result = TransitionResult::new(ConvState::Idle);
            if let Some(content) = message {
                result = result.with_effect(Effect::AppendAssistant {
                    content: content.clone(),
                });
            }
            Ok(result)
        }

        // The interrupted exchange's stream tail must not disturb the pending
        // decision: accumulation is suspended until the decision resumes.
        (
            state @ ConvState::AwaitingDecision { .. },
            ConvEvent::TurnEnded | ConvEvent::AssistantChunk { .. },
        ) => Ok(TransitionResult::new(state.clone())),

        // ============================================================
        // Answering an interrupt
        // ============================================================
        (ConvState::AwaitingDecision { .. }, ConvEvent::Decision { decision }) => {
            decision.validate()?;
            Ok(TransitionResult::new(ConvState::TurnOpen { message: None })
                .with_effect(Effect::AppendUser {
                    content: decision.summary(),
                })
                .with_effect(Effect::ResumeExchange {
                    reply: decision.to_reply(),
                }))
        }

        (ConvState::Idle | ConvState::TurnOpen { .. }, ConvEvent::Decision { .. }) => {
            Err(TransitionError::NoPendingDecision)
        }

        // ============================================================
        // Cancellation
        // ============================================================
        (ConvState::Idle, ConvEvent::Cancel) => Ok(TransitionResult::new(ConvState::Idle)),

        (ConvState::TurnOpen { message }, ConvEvent::Cancel) => {
            let mut result = TransitionResult::new(ConvState::Idle);
            // Partial content up to the cancellation point is preserved.
            if let Some(content) = message {
                result = result.with_effect(Effect::AppendAssistant {
                    content: content.clone(),
                });
            }
            Ok(result.with_effect(Effect::AbortExchange))
        }

        (ConvState::AwaitingDecision { .. }, ConvEvent::Cancel) => {
            Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::AbortExchange))
        }

        // ============================================================
        // Invalid transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "no transition from {state:?} with event {event:?}"
        ))),
    }
}
