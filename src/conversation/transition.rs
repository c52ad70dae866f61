//! Pure mode transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects. Detection, clocks and I/O happen in the executor.

use super::effect::{AnswerMode, Effect, NoticeKind};
use super::event::Event;
use super::message::InboundMessage;
use super::state::{ConversationState, Mode, PendingConfirmation};
use crate::config::ConfirmationConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// When to prompt for consultation relative to answering the triggering message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptPolicy {
    /// Prompt only; the message is answered after the user replies
    #[default]
    Defer,
    /// Answer in standard mode right away, then prompt
    AnswerThenPrompt,
}

/// Static inputs to the transition function
#[derive(Debug, Clone)]
pub struct ControllerContext {
    affirmative: BTreeSet<String>,
    pub policy: PromptPolicy,
    pub pending_timeout: Duration,
}

impl ControllerContext {
    pub fn new(
        affirmative_tokens: &[String],
        policy: PromptPolicy,
        pending_timeout: Duration,
    ) -> Self {
        Self {
            affirmative: affirmative_tokens
                .iter()
                .map(|t| normalize_reply(t))
                .filter(|t| !t.is_empty())
                .collect(),
            policy,
            pending_timeout,
        }
    }

    pub fn from_config(config: &ConfirmationConfig) -> Self {
        Self::new(
            &config.affirmative_tokens,
            config.policy,
            config.pending_timeout(),
        )
    }

    pub fn is_affirmative(&self, reply: &str) -> bool {
        self.affirmative.contains(&normalize_reply(reply))
    }

    fn is_expired(&self, pending: &PendingConfirmation, received_at: DateTime<Utc>) -> bool {
        (received_at - pending.requested_at)
            .to_std()
            .is_ok_and(|age| age > self.pending_timeout)
    }
}

/// Trim, lowercase and drop trailing sentence punctuation
fn normalize_reply(reply: &str) -> String {
    reply
        .trim()
        .to_lowercase()
        .trim_end_matches(['.', '!', '。', '！'])
        .trim_end()
        .to_string()
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

pub fn transition(
    state: &ConversationState,
    context: &ControllerContext,
    event: Event,
) -> TransitionResult {
    match (&state.mode, event) {
        // ============================================================
        // Standard
        // ============================================================
        (
            Mode::Standard,
            Event::UserMessage {
                message,
                signal,
                received_at,
            },
        ) => {
            let escalate = signal.is_some_and(|s| s.should_escalate);
            if escalate {
                request_confirmation(state, context, message, received_at)
            } else {
                TransitionResult::new(state.with_mode(Mode::Standard))
                    .with_effect(Effect::answer(message, AnswerMode::Standard))
            }
        }

        // ============================================================
        // Consultation: detection is suppressed
        // ============================================================
        (Mode::Consultation, Event::UserMessage { message, .. }) => {
            TransitionResult::new(state.with_mode(Mode::Consultation))
                .with_effect(Effect::answer(message, AnswerMode::Consultation))
        }

        // ============================================================
        // PendingConfirmation: every message is the reply
        // ============================================================
        (
            Mode::PendingConfirmation { pending },
            Event::UserMessage {
                message,
                received_at,
                ..
            },
        ) => {
            if context.is_expired(pending, received_at) {
                TransitionResult::new(state.with_mode(Mode::Standard))
                    .with_effect(Effect::Reprocess { message })
            } else if context.is_affirmative(&message.text) {
                TransitionResult::new(state.with_mode(Mode::Consultation)).with_effects([
                    Effect::Notify(NoticeKind::Activated),
                    Effect::answer(pending.original.clone(), AnswerMode::Consultation),
                ])
            } else {
                TransitionResult::new(state.with_mode(Mode::Standard))
                    .with_effect(Effect::Reprocess { message })
            }
        }

        // ============================================================
        // Explicit deactivation
        // ============================================================
        (Mode::Consultation | Mode::PendingConfirmation { .. }, Event::Deactivate) => {
            TransitionResult::new(state.with_mode(Mode::Standard))
                .with_effect(Effect::Notify(NoticeKind::Deactivated))
        }

        (Mode::Standard, Event::Deactivate) => TransitionResult::new(state.clone()),
    }
}

fn request_confirmation(
    state: &ConversationState,
    context: &ControllerContext,
    message: InboundMessage,
    received_at: DateTime<Utc>,
) -> TransitionResult {
    let pending = Mode::PendingConfirmation {
        pending: PendingConfirmation {
            original: message.clone(),
            requested_at: received_at,
        },
    };
    let result = TransitionResult::new(state.with_mode(pending));
    match context.policy {
        PromptPolicy::Defer => result.with_effect(Effect::PromptConfirmation),
        PromptPolicy::AnswerThenPrompt => result.with_effects([
            Effect::answer(message, AnswerMode::Standard),
            Effect::PromptConfirmation,
        ]),
    }
}
