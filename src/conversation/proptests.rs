//! Property-based tests for the mode state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::*;
use crate::config::ConfirmationConfig;
use crate::detection::{EscalationReason, EscalationSignal};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> ControllerContext {
    ControllerContext::from_config(&ConfirmationConfig::default())
}

fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn user_message(text: &str, signal: Option<EscalationSignal>) -> Event {
    Event::UserMessage {
        message: InboundMessage::new(text),
        signal,
        received_at: base_time(),
    }
}

fn escalating_signal() -> EscalationSignal {
    EscalationSignal::from_reasons([EscalationReason::Keyword {
        indicator: "stuck".to_string(),
    }])
}

/// Structural invariants of a state and the effects that produced it
fn effects_are_valid(state: &ConversationState, effects: &[Effect]) -> bool {
    let prompts = effects
        .iter()
        .filter(|e| matches!(e, Effect::PromptConfirmation))
        .count();
    let reprocess = effects
        .iter()
        .filter(|e| matches!(e, Effect::Reprocess { .. }))
        .count();

    // A prompt is emitted iff the transition entered PendingConfirmation
    let prompt_ok = (prompts == 1) == state.is_pending();
    // Reprocessed messages always land in Standard
    let reprocess_ok = reprocess == 0 || matches!(state.mode, Mode::Standard);
    prompts <= 1 && reprocess <= 1 && prompt_ok && reprocess_ok
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_reply() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("yes".to_string()),
        Just("YES".to_string()),
        Just("Sure.".to_string()),
        Just("ok".to_string()),
        Just("はい".to_string()),
        Just("no".to_string()),
        "[a-zA-Z ]{0,30}",
    ]
}

fn arb_signal() -> impl Strategy<Value = Option<EscalationSignal>> {
    prop_oneof![
        Just(None),
        Just(Some(EscalationSignal::none())),
        Just(Some(escalating_signal())),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        4 => (arb_reply(), arb_signal()).prop_map(|(text, signal)| user_message(&text, signal)),
        1 => Just(Event::Deactivate),
    ]
}

fn arb_state() -> impl Strategy<Value = ConversationState> {
    let mode = prop_oneof![
        Just(Mode::Standard),
        Just(Mode::Consultation),
        "[a-zA-Z ]{1,30}".prop_map(|text| Mode::PendingConfirmation {
            pending: PendingConfirmation {
                original: InboundMessage::new(text),
                requested_at: base_time(),
            },
        }),
    ];
    (mode, any::<bool>()).prop_map(|(mode, deep_exploration_active)| ConversationState {
        mode,
        deep_exploration_active,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: effects are consistent with the resulting state
    #[test]
    fn prop_transitions_produce_valid_effects(events in proptest::collection::vec(arb_event(), 0..20)) {
        let mut state = ConversationState::default();
        let ctx = test_context();

        for event in events {
            let result = transition(&state, &ctx, event);
            prop_assert!(
                effects_are_valid(&result.new_state, &result.effects),
                "Invalid effects for state {:?}: {:?}",
                result.new_state,
                result.effects
            );
            state = result.new_state;
        }
    }

    // Invariant 2: non-escalating messages never leave Standard
    #[test]
    fn prop_standard_without_escalation_stays_standard(
        text in "[a-zA-Z ]{0,40}",
        escalate in prop_oneof![Just(None), Just(Some(EscalationSignal::none()))],
        deep in any::<bool>(),
    ) {
        let state = ConversationState { mode: Mode::Standard, deep_exploration_active: deep };
        let result = transition(&state, &test_context(), user_message(&text, escalate));
        prop_assert_eq!(result.new_state, state);
        prop_assert_eq!(
            result.effects,
            vec![Effect::answer(InboundMessage::new(text), AnswerMode::Standard)]
        );
    }

    // Invariant 3: no message leaves Consultation
    #[test]
    fn prop_consultation_is_sticky(texts in proptest::collection::vec((arb_reply(), arb_signal()), 1..20)) {
        let mut state = ConversationState { mode: Mode::Consultation, deep_exploration_active: false };
        let ctx = test_context();

        for (text, signal) in texts {
            state = transition(&state, &ctx, user_message(&text, signal)).new_state;
            prop_assert_eq!(&state.mode, &Mode::Consultation);
        }
    }

    // Invariant 4: deactivation always lands in Standard
    #[test]
    fn prop_deactivate_reaches_standard(state in arb_state()) {
        let result = transition(&state, &test_context(), Event::Deactivate);
        prop_assert_eq!(result.new_state.mode, Mode::Standard);
        prop_assert!(result.effects.len() <= 1);
    }

    // Invariant 5: the deep-exploration flag is never touched by transitions
    #[test]
    fn prop_transition_preserves_deep_flag(state in arb_state(), event in arb_event()) {
        let result = transition(&state, &test_context(), event);
        prop_assert_eq!(result.new_state.deep_exploration_active, state.deep_exploration_active);
    }

    // Invariant 6: a pending reply resolves to Consultation iff it is affirmative
    #[test]
    fn prop_pending_reply_resolves(original in "[a-zA-Z ]{1,30}", reply in arb_reply()) {
        let ctx = test_context();
        let state = ConversationState {
            mode: Mode::PendingConfirmation {
                pending: PendingConfirmation {
                    original: InboundMessage::new(original.clone()),
                    requested_at: base_time(),
                },
            },
            deep_exploration_active: false,
        };

        let result = transition(&state, &ctx, user_message(&reply, None));
        prop_assert!(!result.new_state.is_pending());

        if ctx.is_affirmative(&reply) {
            prop_assert_eq!(result.new_state.mode, Mode::Consultation);
            prop_assert_eq!(
                result.effects,
                vec![
                    Effect::Notify(NoticeKind::Activated),
                    Effect::answer(InboundMessage::new(original), AnswerMode::Consultation),
                ]
            );
        } else {
            prop_assert_eq!(result.new_state.mode, Mode::Standard);
            prop_assert_eq!(
                result.effects,
                vec![Effect::Reprocess { message: InboundMessage::new(reply) }]
            );
        }
    }
}
