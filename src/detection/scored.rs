//! Threshold combination over pluggable scoring functions
//!
//! Scores come from external collaborators (sentiment models, classifiers).
//! This module only decides whether any score crosses its threshold. A
//! scorer that fails, declines, times out or returns a value outside its
//! documented range is treated as unavailable and never triggers escalation.

use super::{EscalationReason, EscalationStrategy};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// In [-1, 1]; negative is unhappy
    Sentiment,
    Distress,
    Complexity,
    Urgency,
    AnalysisNeed,
}

impl ScoreKind {
    pub fn range(self) -> RangeInclusive<f64> {
        match self {
            Self::Sentiment => -1.0..=1.0,
            _ => 0.0..=1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scorer unavailable: {0}")]
    Unavailable(String),
    #[error("scorer failed: {0}")]
    Failed(String),
    #[error("scorer timed out after {0:?}")]
    TimedOut(Duration),
}

/// A single scoring collaborator
#[async_trait]
pub trait Scorer: Send + Sync {
    fn kind(&self) -> ScoreKind;

    /// `Ok(None)` means the scorer has no opinion on this message
    async fn score(&self, message: &str, context: Option<&str>) -> Result<Option<f64>, ScoringError>;
}

/// Escalation thresholds; sentiment triggers below, the others above
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreThresholds {
    pub sentiment_below: f64,
    pub distress_above: f64,
    pub complexity_above: f64,
    pub urgency_above: f64,
    pub analysis_need_above: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            sentiment_below: -0.3,
            distress_above: 0.6,
            complexity_above: 0.7,
            urgency_above: 0.8,
            analysis_need_above: 0.7,
        }
    }
}

impl ScoreThresholds {
    pub fn crosses(&self, kind: ScoreKind, value: f64) -> bool {
        match kind {
            ScoreKind::Sentiment => value < self.sentiment_below,
            ScoreKind::Distress => value > self.distress_above,
            ScoreKind::Complexity => value > self.complexity_above,
            ScoreKind::Urgency => value > self.urgency_above,
            ScoreKind::AnalysisNeed => value > self.analysis_need_above,
        }
    }
}

pub struct ScoredStrategy {
    scorers: Vec<Arc<dyn Scorer>>,
    thresholds: ScoreThresholds,
    /// Deadline for each scorer call
    timeout: Duration,
}

impl ScoredStrategy {
    pub fn new(
        scorers: Vec<Arc<dyn Scorer>>,
        thresholds: ScoreThresholds,
        timeout: Duration,
    ) -> Self {
        Self {
            scorers,
            thresholds,
            timeout,
        }
    }

    async fn score_within_deadline(
        &self,
        scorer: &dyn Scorer,
        message: &str,
        context: Option<&str>,
    ) -> Result<Option<f64>, ScoringError> {
        tokio::time::timeout(self.timeout, scorer.score(message, context))
            .await
            .unwrap_or(Err(ScoringError::TimedOut(self.timeout)))
    }

    /// A usable score, or `None` when the scorer is unavailable
    fn usable(kind: ScoreKind, result: Result<Option<f64>, ScoringError>) -> Option<f64> {
        match result {
            Ok(Some(value)) if value.is_finite() && kind.range().contains(&value) => Some(value),
            Ok(Some(value)) => {
                tracing::warn!(?kind, value, "Score outside documented range, ignoring");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(?kind, error = %e, "Scorer unavailable, treating as non-escalating");
                None
            }
        }
    }
}

#[async_trait]
impl EscalationStrategy for ScoredStrategy {
    fn name(&self) -> &'static str {
        "scored"
    }

    async fn assess(&self, message: &str, context: Option<&str>) -> Vec<EscalationReason> {
        let results = join_all(
            self.scorers.iter().map(|scorer| async move {
                let result = self
                    .score_within_deadline(scorer.as_ref(), message, context)
                    .await;
                (scorer.kind(), result)
            }),
        )
        .await;

        results
            .into_iter()
            .filter_map(|(kind, result)| {
                let value = Self::usable(kind, result)?;
                self.thresholds
                    .crosses(kind, value)
                    .then_some(EscalationReason::Score { kind })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingScorer, FixedScorer, StalledScorer};
    use tokio::time::Instant;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn strategy(scorers: Vec<Arc<dyn Scorer>>) -> ScoredStrategy {
        ScoredStrategy::new(scorers, ScoreThresholds::default(), TIMEOUT)
    }

    #[test]
    fn test_default_thresholds() {
        let t = ScoreThresholds::default();
        assert!(t.crosses(ScoreKind::Sentiment, -0.31));
        assert!(!t.crosses(ScoreKind::Sentiment, -0.3));
        assert!(t.crosses(ScoreKind::Distress, 0.61));
        assert!(!t.crosses(ScoreKind::Distress, 0.6));
        assert!(t.crosses(ScoreKind::Complexity, 0.71));
        assert!(!t.crosses(ScoreKind::Urgency, 0.8));
        assert!(t.crosses(ScoreKind::Urgency, 0.81));
        assert!(t.crosses(ScoreKind::AnalysisNeed, 0.9));
    }

    #[tokio::test]
    async fn test_any_crossing_score_triggers() {
        let s = strategy(vec![
            Arc::new(FixedScorer::new(ScoreKind::Sentiment, Some(0.5))),
            Arc::new(FixedScorer::new(ScoreKind::Complexity, Some(0.9))),
        ]);
        let reasons = s.assess("how do I restructure my team?", None).await;
        assert_eq!(
            reasons,
            vec![EscalationReason::Score {
                kind: ScoreKind::Complexity
            }]
        );
    }

    #[tokio::test]
    async fn test_failing_scorer_does_not_trigger() {
        let s = strategy(vec![
            Arc::new(FailingScorer::new(ScoreKind::Distress)),
            Arc::new(FixedScorer::new(ScoreKind::Urgency, None)),
        ]);
        assert!(s.assess("anything", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_and_nan_scores_ignored() {
        let s = strategy(vec![
            Arc::new(FixedScorer::new(ScoreKind::Distress, Some(7.0))),
            Arc::new(FixedScorer::new(ScoreKind::Complexity, Some(f64::NAN))),
            Arc::new(FixedScorer::new(ScoreKind::Sentiment, Some(-3.0))),
        ]);
        assert!(s.assess("anything", None).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_scorer_times_out_without_triggering() {
        let s = strategy(vec![
            Arc::new(StalledScorer::new(ScoreKind::Distress)),
            Arc::new(FixedScorer::new(ScoreKind::Complexity, Some(0.9))),
        ]);

        let start = Instant::now();
        let reasons = s.assess("how do I restructure my team?", None).await;

        assert_eq!(Instant::now() - start, TIMEOUT);
        assert_eq!(
            reasons,
            vec![EscalationReason::Score {
                kind: ScoreKind::Complexity
            }]
        );
    }

    #[test]
    fn test_thresholds_deserialize_with_defaults() {
        let t: ScoreThresholds = toml::from_str("urgency_above = 0.5").unwrap();
        assert!(t.crosses(ScoreKind::Urgency, 0.6));
        assert!(t.crosses(ScoreKind::Sentiment, -0.5));
    }
}
