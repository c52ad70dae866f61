//! Conversation mode controller
//!
//! Implements the Elm Architecture pattern: a pure `transition` decides the
//! next mode and the effects to run, and `ModeController` executes those
//! effects (prompts, notices, model selection, acknowledgment, invocation).

mod effect;
mod event;
mod executor;
mod message;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

#[allow(unused_imports)] // Public API re-exports
pub use effect::{AnswerMode, Effect, NoticeKind};
#[allow(unused_imports)]
pub use event::Event;
pub use executor::ModeController;
pub use message::{InboundMessage, OutboundKind, OutboundMessage};
#[allow(unused_imports)]
pub use state::{ConversationState, Mode, PendingConfirmation};
#[allow(unused_imports)]
pub use transition::{transition, ControllerContext, PromptPolicy, TransitionResult};

use async_trait::async_trait;

/// Where a turn's outbound messages go, in production order
#[async_trait]
pub trait OutboundSink: Send + Sync {
    async fn deliver(&self, message: OutboundMessage);
}
