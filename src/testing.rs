//! Mock implementations for testing
//!
//! These mocks enable pipeline tests without network access.

use crate::conversation::{OutboundKind, OutboundMessage, OutboundSink};
use crate::detection::{ScoreKind, Scorer, ScoringError};
use crate::llm::{Completion, CompletionRequest, CompletionService, LlmError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared ordered log of observable events across mocks
pub type Timeline = Arc<Mutex<Vec<String>>>;

// ============================================================================
// Mock completion service
// ============================================================================

/// Completion service that returns queued responses
pub struct MockCompletionService {
    responses: Mutex<VecDeque<Result<Completion, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
    timeline: Option<Timeline>,
}

#[allow(dead_code)]
impl MockCompletionService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
            timeline: None,
        }
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    pub fn queue_text(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(Completion::text(text)));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockCompletionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(timeline) = &self.timeline {
            timeline
                .lock()
                .unwrap()
                .push(format!("complete:{}", request.model));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn provider(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Scorers
// ============================================================================

/// Scorer that always returns the same value
pub struct FixedScorer {
    kind: ScoreKind,
    value: Option<f64>,
}

impl FixedScorer {
    pub fn new(kind: ScoreKind, value: Option<f64>) -> Self {
        Self { kind, value }
    }
}

#[async_trait]
impl Scorer for FixedScorer {
    fn kind(&self) -> ScoreKind {
        self.kind
    }

    async fn score(&self, _message: &str, _context: Option<&str>) -> Result<Option<f64>, ScoringError> {
        Ok(self.value)
    }
}

/// Scorer whose backend is always down
pub struct FailingScorer {
    kind: ScoreKind,
}

impl FailingScorer {
    pub fn new(kind: ScoreKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Scorer for FailingScorer {
    fn kind(&self) -> ScoreKind {
        self.kind
    }

    async fn score(&self, _message: &str, _context: Option<&str>) -> Result<Option<f64>, ScoringError> {
        Err(ScoringError::Unavailable("model offline".to_string()))
    }
}

/// Scorer whose backend never answers
pub struct StalledScorer {
    kind: ScoreKind,
}

impl StalledScorer {
    pub fn new(kind: ScoreKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Scorer for StalledScorer {
    fn kind(&self) -> ScoreKind {
        self.kind
    }

    async fn score(&self, _message: &str, _context: Option<&str>) -> Result<Option<f64>, ScoringError> {
        std::future::pending().await
    }
}

// ============================================================================
// Recording sink
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<OutboundMessage>>,
    timeline: Option<Timeline>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    pub fn delivered(&self) -> Vec<OutboundMessage> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<OutboundKind> {
        self.delivered.lock().unwrap().iter().map(|m| m.kind).collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }
}

#[async_trait]
impl OutboundSink for RecordingSink {
    async fn deliver(&self, message: OutboundMessage) {
        if let Some(timeline) = &self.timeline {
            timeline
                .lock()
                .unwrap()
                .push(format!("deliver:{}", message.kind.as_str()));
        }
        self.delivered.lock().unwrap().push(message);
    }
}
