//! Effects produced by mode transitions

use super::message::InboundMessage;
use serde::Serialize;

/// Pipeline flavour used to answer a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    Standard,
    Consultation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Activated,
    Deactivated,
}

/// Effects to be executed after a transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the user whether to switch to consultation mode
    PromptConfirmation,

    Notify(NoticeKind),

    /// Run the answer pipeline for `message`
    Answer {
        message: InboundMessage,
        mode: AnswerMode,
    },

    /// Feed `message` back in as a fresh turn
    Reprocess { message: InboundMessage },
}

impl Effect {
    pub fn answer(message: InboundMessage, mode: AnswerMode) -> Self {
        Effect::Answer { message, mode }
    }
}
