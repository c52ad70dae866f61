//! Events that drive mode transitions

use super::message::InboundMessage;
use crate::detection::EscalationSignal;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum Event {
    UserMessage {
        message: InboundMessage,
        /// `None` when detection was not run (consultation or pending reply)
        signal: Option<EscalationSignal>,
        received_at: DateTime<Utc>,
    },
    Deactivate,
}
