//! Turn executor
//!
//! Feeds events through `transition` and runs the effects against a working
//! copy of the state, committed when the turn completes. A `Reprocess`
//! effect queues a fresh user-message event, so a non-affirmative
//! confirmation reply is handled like any other message.

use super::effect::{AnswerMode, Effect, NoticeKind};
use super::event::Event;
use super::message::{InboundMessage, OutboundKind, OutboundMessage};
use super::state::{ConversationState, Mode};
use super::transition::{transition, ControllerContext};
use super::OutboundSink;
use crate::acknowledge::ImmediateResponseDispatcher;
use crate::config::{AppConfig, ConfigError, MessagesConfig};
use crate::detection::{DeepExplorationDetector, Scorer, SignalDetector};
use crate::invoker::ResilientInvoker;
use crate::llm::CompletionService;
use crate::prompt::{self, RequestOptions};
use crate::selector::ModelSelector;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;

pub struct ModeController {
    detector: SignalDetector,
    selector: ModelSelector,
    dispatcher: ImmediateResponseDispatcher,
    invoker: ResilientInvoker,
    llm: Arc<dyn CompletionService>,
    context: ControllerContext,
    messages: MessagesConfig,
    max_tokens: Option<u32>,
}

impl ModeController {
    pub fn from_config(
        config: &AppConfig,
        llm: Arc<dyn CompletionService>,
        scorers: Vec<Arc<dyn Scorer>>,
    ) -> Result<Self, ConfigError> {
        let deep = DeepExplorationDetector::new(
            &config.detection.deep_indicators,
            &config.detection.deep_patterns,
        )?;

        Ok(Self {
            detector: SignalDetector::from_config(&config.detection, scorers),
            selector: ModelSelector::new(&config.models, deep),
            dispatcher: ImmediateResponseDispatcher::new(&config.acknowledgments),
            invoker: ResilientInvoker::new(config.retry.to_policy()?),
            llm,
            context: ControllerContext::from_config(&config.confirmation),
            messages: config.messages.clone(),
            max_tokens: config.llm.max_tokens,
        })
    }

    #[allow(dead_code)] // Custom retry policies and classifiers
    pub fn with_invoker(mut self, invoker: ResilientInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    pub async fn handle_message(
        &self,
        state: &mut ConversationState,
        message: InboundMessage,
        sink: &dyn OutboundSink,
    ) {
        self.handle_message_at(state, message, Utc::now(), sink)
            .await;
    }

    /// Handle one inbound message received at `received_at`
    pub async fn handle_message_at(
        &self,
        state: &mut ConversationState,
        message: InboundMessage,
        received_at: DateTime<Utc>,
        sink: &dyn OutboundSink,
    ) {
        let event = self.user_message_event(state, message, received_at).await;
        self.run(state, event, received_at, sink).await;
    }

    /// Return to standard mode, dropping any pending confirmation
    pub async fn deactivate(&self, state: &mut ConversationState, sink: &dyn OutboundSink) {
        self.run(state, Event::Deactivate, Utc::now(), sink).await;
    }

    /// Detection runs only in standard mode; elsewhere it cannot change the outcome.
    async fn user_message_event(
        &self,
        state: &ConversationState,
        message: InboundMessage,
        received_at: DateTime<Utc>,
    ) -> Event {
        let signal = if matches!(state.mode, Mode::Standard) {
            let signal = self
                .detector
                .evaluate(&message.text, message.context.as_deref())
                .await;
            if signal.should_escalate {
                tracing::info!(reasons = ?signal.reasons, "Escalation signal detected");
            }
            Some(signal)
        } else {
            None
        };

        Event::UserMessage {
            message,
            signal,
            received_at,
        }
    }

    /// Works on a copy of `state` and commits it once every effect has
    /// reached its outcome. A dropped turn leaves the conversation untouched.
    async fn run(
        &self,
        state: &mut ConversationState,
        event: Event,
        received_at: DateTime<Utc>,
        sink: &dyn OutboundSink,
    ) {
        let mut next = state.clone();
        let mut events_to_process = VecDeque::from([event]);

        while let Some(event) = events_to_process.pop_front() {
            let result = transition(&next, &self.context, event);

            if result.new_state.mode.name() != next.mode.name() {
                tracing::info!(
                    from = next.mode.name(),
                    to = result.new_state.mode.name(),
                    "Mode transition"
                );
            }
            next = result.new_state;

            for effect in result.effects {
                if let Some(message) = self.execute_effect(&mut next, effect, sink).await {
                    let event = self.user_message_event(&next, message, received_at).await;
                    events_to_process.push_back(event);
                }
            }
        }

        *state = next;
    }

    /// Run one effect; returns a message to reprocess, if any
    async fn execute_effect(
        &self,
        state: &mut ConversationState,
        effect: Effect,
        sink: &dyn OutboundSink,
    ) -> Option<InboundMessage> {
        match effect {
            Effect::PromptConfirmation => {
                sink.deliver(OutboundMessage::new(
                    OutboundKind::ConfirmationPrompt,
                    &self.messages.confirmation_prompt,
                ))
                .await;
                None
            }
            Effect::Notify(kind) => {
                let text = match kind {
                    NoticeKind::Activated => &self.messages.activation_notice,
                    NoticeKind::Deactivated => &self.messages.deactivation_notice,
                };
                sink.deliver(OutboundMessage::new(OutboundKind::Notice, text))
                    .await;
                None
            }
            Effect::Answer { message, mode } => {
                self.answer(state, &message, mode, sink).await;
                None
            }
            Effect::Reprocess { message } => {
                tracing::debug!("Reprocessing reply as a fresh turn");
                Some(message)
            }
        }
    }

    async fn answer(
        &self,
        state: &mut ConversationState,
        message: &InboundMessage,
        mode: AnswerMode,
        sink: &dyn OutboundSink,
    ) {
        let model = self.selector.select(state, &message.text).to_string();

        if let Some(ack) = self.dispatcher.acknowledge(&message.topic_tags()) {
            sink.deliver(OutboundMessage::new(OutboundKind::Acknowledgment, ack))
                .await;
        }

        let request = prompt::build_request(
            mode,
            state.deep_exploration_active,
            &model,
            &message.text,
            RequestOptions {
                max_tokens: self.max_tokens,
                timeout: self.invoker.policy().per_attempt_timeout,
            },
        );

        let outcome = self
            .invoker
            .invoke("answer", || self.llm.complete(&request))
            .await;

        let outbound = match outcome {
            Ok(completion) => OutboundMessage::new(OutboundKind::Answer, completion.text),
            Err(e) => {
                tracing::error!(
                    model = %model,
                    ?mode,
                    attempts = e.attempts(),
                    error = %e,
                    "Answer failed, sending fallback"
                );
                OutboundMessage::new(OutboundKind::Fallback, &self.messages.fallback)
            }
        };
        sink.deliver(outbound).await;
    }
}
