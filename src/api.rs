//! HTTP API
//!
//! Stands in for the chat transport: post messages, read state, leave
//! consultation mode, and stream outbound messages over SSE.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::session::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }
}
