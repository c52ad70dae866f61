//! Escalation signal detection
//!
//! A single `SignalDetector` combines pluggable strategies (global keywords,
//! context-scoped keywords, scored thresholds) with a logical OR. Detection
//! never fails: a strategy that cannot decide contributes no reasons, so the
//! conversation stays in standard mode.

mod deep;
mod keyword;
mod scored;

pub use deep::DeepExplorationDetector;
pub use keyword::{ContextKeywordStrategy, KeywordStrategy};
#[allow(unused_imports)] // ScoringError is for Scorer implementors
pub use scored::{ScoreKind, ScoreThresholds, ScoredStrategy, Scorer, ScoringError};

use crate::config::DetectionConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Why a message was flagged for escalation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EscalationReason {
    Keyword { indicator: String },
    ContextKeyword { context: String, indicator: String },
    Score { kind: ScoreKind },
}

/// Per-message detection result. Recomputed every turn, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EscalationSignal {
    pub should_escalate: bool,
    pub reasons: BTreeSet<EscalationReason>,
}

impl EscalationSignal {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_reasons(reasons: impl IntoIterator<Item = EscalationReason>) -> Self {
        let reasons: BTreeSet<_> = reasons.into_iter().collect();
        Self {
            should_escalate: !reasons.is_empty(),
            reasons,
        }
    }
}

/// One way of deciding that a message warrants escalation
#[async_trait]
pub trait EscalationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reasons this strategy found; empty means "does not trigger"
    async fn assess(&self, message: &str, context: Option<&str>) -> Vec<EscalationReason>;
}

#[derive(Default)]
pub struct SignalDetector {
    strategies: Vec<Box<dyn EscalationStrategy>>,
}

impl SignalDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: impl EscalationStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Build the keyword strategies from config, plus a scored strategy when
    /// scorers are supplied.
    pub fn from_config(config: &DetectionConfig, scorers: Vec<Arc<dyn Scorer>>) -> Self {
        let mut detector = Self::new()
            .with_strategy(KeywordStrategy::new(&config.indicators))
            .with_strategy(ContextKeywordStrategy::new(&config.context_indicators));
        if !scorers.is_empty() {
            detector = detector.with_strategy(ScoredStrategy::new(
                scorers,
                config.thresholds,
                config.scorer_timeout(),
            ));
        }
        detector
    }

    pub async fn evaluate(&self, message: &str, context: Option<&str>) -> EscalationSignal {
        let mut reasons = Vec::new();
        for strategy in &self.strategies {
            let found = strategy.assess(message, context).await;
            if !found.is_empty() {
                tracing::debug!(
                    strategy = strategy.name(),
                    count = found.len(),
                    "Escalation strategy triggered"
                );
            }
            reasons.extend(found);
        }
        EscalationSignal::from_reasons(reasons)
    }
}
