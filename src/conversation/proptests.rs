use super::{transition, ConvEvent, ConvState, Effect};
use crate::decision::InterruptDecision;
use crate::protocol::DraftEmail;
use proptest::prelude::*;

fn draft() -> DraftEmail {
    DraftEmail {
        to: vec!["a@b.com".to_string()],
        subject: "S".to_string(),
        body: "B".to_string(),
        cc: None,
        is_html: false,
    }
}

fn arb_event() -> impl Strategy<Value = ConvEvent> {
    prop_oneof![
        "[a-z ]{1,12}".prop_map(|text| ConvEvent::Submit { text }),
        "[a-z ]{0,12}".prop_map(|text| ConvEvent::AssistantChunk { text }),
        Just(ConvEvent::InterruptRequest {
            payload: "p".to_string(),
            draft: draft(),
        }),
        Just(ConvEvent::TurnEnded),
        Just(ConvEvent::Decision {
            decision: InterruptDecision::Approve { is_html: false },
        }),
        Just(ConvEvent::Cancel),
    ]
}

proptest! {
    // Whatever happened before, cancel lands back in idle and the machine
    // accepts a fresh submit afterwards.
    #[test]
    fn cancel_always_returns_to_idle(events in prop::collection::vec(arb_event(), 0..40)) {
        let mut state = ConvState::Idle;
        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
            }
        }

        let result = transition(&state, ConvEvent::Cancel).unwrap();
        prop_assert!(result.new_state.is_idle());
        let reopened = transition(
            &result.new_state,
            ConvEvent::Submit { text: "again".to_string() },
        )
        .unwrap();
        let reopened_to_turn_open = matches!(reopened.new_state, ConvState::TurnOpen { .. });
        prop_assert!(reopened_to_turn_open);
    }

    // Chunks of one turn end up as a single transcript entry, in arrival
    // order, joined with a blank line.
    #[test]
    fn chunks_accumulate_in_order(chunks in prop::collection::vec("[a-z]{1,8}", 1..10)) {
        let mut state = transition(
            &ConvState::Idle,
            ConvEvent::Submit { text: "go".to_string() },
        )
        .unwrap()
        .new_state;
        for text in &chunks {
            state = transition(&state, ConvEvent::AssistantChunk { text: text.clone() })
                .unwrap()
                .new_state;
        }

        let result = transition(&state, ConvEvent::TurnEnded).unwrap();
        prop_assert_eq!(result.new_state, ConvState::Idle);
        prop_assert_eq!(
            result.effects,
            vec![Effect::AppendAssistant { content: chunks.join("\n\n") }]
        );
    }

    // While a decision is pending, the interrupted stream's tail is inert:
    // no state change, no effects, regardless of what arrives.
    #[test]
    fn awaiting_decision_ignores_stream_tail(
        tail in prop::collection::vec(
            prop_oneof![
                "[a-z]{0,8}".prop_map(|text| ConvEvent::AssistantChunk { text }),
                Just(ConvEvent::TurnEnded),
            ],
            0..20,
        ),
    ) {
        let blocked = ConvState::AwaitingDecision {
            payload: "p".to_string(),
            draft: draft(),
        };
        let mut state = blocked.clone();
        for event in tail {
            let result = transition(&state, event).unwrap();
            prop_assert!(result.effects.is_empty());
            state = result.new_state;
        }
        prop_assert_eq!(state, blocked);
    }

    // A submit while any turn is open is rejected without disturbing the
    // open turn's accumulated content.
    #[test]
    fn submit_is_exclusive_while_a_turn_is_open(
        accumulated in proptest::option::of("[a-z]{1,8}"),
        text in "[a-z ]{1,12}",
    ) {
        let state = ConvState::TurnOpen { message: accumulated };
        let result = transition(&state, ConvEvent::Submit { text });
        prop_assert!(matches!(result, Err(super::TransitionError::TurnInFlight)));
    }
}
