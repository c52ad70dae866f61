//! API request and response types

use crate::conversation::{ConversationState, InboundMessage, OutboundMessage};
use crate::session::Turn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Send a message
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub topics: BTreeSet<String>,
}

impl From<MessageRequest> for InboundMessage {
    fn from(req: MessageRequest) -> Self {
        InboundMessage {
            text: req.text,
            context: req.context.filter(|c| !c.trim().is_empty()),
            topics: req.topics,
        }
    }
}

/// Messages produced by a turn plus the resulting state
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub messages: Vec<OutboundMessage>,
    pub state: ConversationState,
}

impl From<Turn> for TurnResponse {
    fn from(turn: Turn) -> Self {
        Self {
            messages: turn.messages,
            state: turn.state,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub conversation_id: String,
    pub state: ConversationState,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
