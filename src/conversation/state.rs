//! Per-conversation state

use super::message::InboundMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The message that triggered a confirmation prompt, kept until the reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub original: InboundMessage,
    pub requested_at: DateTime<Utc>,
}

/// Conversation mode. Pending data lives inside its variant, so it exists
/// exactly while a confirmation is outstanding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Standard,
    PendingConfirmation {
        pending: PendingConfirmation,
    },
    Consultation,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::PendingConfirmation { .. } => "pending_confirmation",
            Self::Consultation => "consultation",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub mode: Mode,
    /// Sticky once set; only an explicit reset clears it
    pub deep_exploration_active: bool,
}

impl ConversationState {
    pub fn is_pending(&self) -> bool {
        matches!(self.mode, Mode::PendingConfirmation { .. })
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        match &self.mode {
            Mode::PendingConfirmation { pending } => Some(pending),
            _ => None,
        }
    }

    /// The stored message awaiting confirmation, if any
    pub fn pending_original_message(&self) -> Option<&InboundMessage> {
        self.pending().map(|p| &p.original)
    }

    /// Copy of this state with a different mode
    pub(super) fn with_mode(&self, mode: Mode) -> Self {
        Self {
            mode,
            deep_exploration_active: self.deep_exploration_active,
        }
    }
}
