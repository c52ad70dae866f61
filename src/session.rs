//! Per-conversation sessions
//!
//! Owns every `ConversationState`, serializes turns within a conversation
//! and fans outbound messages out to stream subscribers. Sessions that hold
//! nothing beyond a fresh state are pruned periodically.

use crate::conversation::{
    ConversationState, InboundMessage, ModeController, OutboundMessage, OutboundSink,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::Instrument;

const BROADCAST_CAPACITY: usize = 64;

/// Outcome of one turn
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub messages: Vec<OutboundMessage>,
    pub state: ConversationState,
}

struct Session {
    /// Held for a whole turn, so turns in one conversation never overlap
    state: Mutex<ConversationState>,
    broadcast_tx: broadcast::Sender<OutboundMessage>,
}

impl Session {
    fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            state: Mutex::new(ConversationState::default()),
            broadcast_tx,
        }
    }

    /// No subscribers, no turn in flight, and a state equal to a new session's
    fn is_idle(&self) -> bool {
        self.broadcast_tx.receiver_count() == 0
            && self
                .state
                .try_lock()
                .is_ok_and(|state| *state == ConversationState::default())
    }
}

/// Collects a turn's messages and publishes each one as it is produced
struct TurnSink {
    collected: Mutex<Vec<OutboundMessage>>,
    broadcast_tx: broadcast::Sender<OutboundMessage>,
}

impl TurnSink {
    fn new(broadcast_tx: broadcast::Sender<OutboundMessage>) -> Self {
        Self {
            collected: Mutex::new(Vec::new()),
            broadcast_tx,
        }
    }

    fn into_messages(self) -> Vec<OutboundMessage> {
        self.collected.into_inner()
    }
}

#[async_trait]
impl OutboundSink for TurnSink {
    async fn deliver(&self, message: OutboundMessage) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(message.clone());
        self.collected.lock().await.push(message);
    }
}

pub struct SessionManager {
    controller: ModeController,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(controller: ModeController) -> Self {
        Self {
            controller,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, conversation_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(conversation_id).cloned()
    }

    async fn get_or_create(&self, conversation_id: &str) -> Arc<Session> {
        if let Some(session) = self.get(conversation_id).await {
            return session;
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                tracing::info!(conversation_id, "Created session");
                Arc::new(Session::new())
            })
            .clone()
    }

    /// Run one turn for `message`, creating the conversation on first contact
    pub async fn on_message(&self, conversation_id: &str, message: InboundMessage) -> Turn {
        let session = self.get_or_create(conversation_id).await;
        let span = tracing::info_span!("turn", conversation_id);

        async {
            let mut state = session.state.lock().await;
            let sink = TurnSink::new(session.broadcast_tx.clone());
            self.controller
                .handle_message(&mut state, message, &sink)
                .await;
            Turn {
                messages: sink.into_messages(),
                state: state.clone(),
            }
        }
        .instrument(span)
        .await
    }

    pub async fn on_text(&self, conversation_id: &str, text: &str) -> Turn {
        self.on_message(conversation_id, InboundMessage::new(text))
            .await
    }

    /// Current state, or `None` for an unknown conversation
    pub async fn snapshot(&self, conversation_id: &str) -> Option<ConversationState> {
        let session = self.get(conversation_id).await?;
        let state = session.state.lock().await.clone();
        Some(state)
    }

    pub async fn deactivate(&self, conversation_id: &str) -> Option<Turn> {
        let session = self.get(conversation_id).await?;
        let mut state = session.state.lock().await;
        let sink = TurnSink::new(session.broadcast_tx.clone());
        self.controller.deactivate(&mut state, &sink).await;
        tracing::info!(conversation_id, "Deactivated consultation mode");
        Some(Turn {
            messages: sink.into_messages(),
            state: state.clone(),
        })
    }

    /// Clear the sticky deep-exploration flag
    pub async fn reset_deep_exploration(&self, conversation_id: &str) -> Option<ConversationState> {
        let session = self.get(conversation_id).await?;
        let mut state = session.state.lock().await;
        state.deep_exploration_active = false;
        tracing::info!(conversation_id, "Reset deep exploration");
        Some(state.clone())
    }

    pub async fn subscribe(&self, conversation_id: &str) -> broadcast::Receiver<OutboundMessage> {
        self.get_or_create(conversation_id)
            .await
            .broadcast_tx
            .subscribe()
    }

    /// Drop idle sessions. A session still referenced by a caller is kept.
    /// Returns the number removed.
    pub async fn prune_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| Arc::strong_count(session) > 1 || !session.is_idle());
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = sessions.len(), "Pruned idle sessions");
        }
        removed
    }

    /// Run `prune_idle` every `every` on a background task
    pub fn start_pruning(self: &Arc<Self>, every: Duration) {
        let sessions = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                sessions.prune_idle().await;
            }
        });
    }
}
