//! Inbound and outbound chat messages

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A user message as handed over by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub text: String,
    /// Caller-supplied context tag, e.g. `career.characteristic`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub topics: BTreeSet<String>,
}

impl InboundMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: None,
            topics: BTreeSet::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.insert(topic.into());
        self
    }

    /// Explicit topics plus every `.`-separated segment of the context tag
    pub fn topic_tags(&self) -> BTreeSet<String> {
        let mut tags = self.topics.clone();
        if let Some(context) = &self.context {
            tags.extend(
                context
                    .split('.')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
        tags
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundKind {
    Acknowledgment,
    ConfirmationPrompt,
    Notice,
    Answer,
    Fallback,
}

impl OutboundKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acknowledgment => "acknowledgment",
            Self::ConfirmationPrompt => "confirmation_prompt",
            Self::Notice => "notice",
            Self::Answer => "answer",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: Uuid,
    pub kind: OutboundKind,
    pub text: String,
}

impl OutboundMessage {
    pub fn new(kind: OutboundKind, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
        }
    }
}
