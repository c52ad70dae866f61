//! Bounded retry around remote completion calls
//!
//! Each attempt runs under a hard timeout. Transient failures (network,
//! timeout, rate limit, 5xx) are retried after a clamped exponential delay;
//! terminal failures surface on the first attempt. Exhaustion is reported
//! as an error so the caller can produce its own fallback.

use crate::llm::{LlmError, LlmErrorKind};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Retry schedule and per-attempt deadline
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Scale of the exponential term
    pub multiplier: Duration,
    pub exponential_base: f64,
    pub floor: Duration,
    pub ceiling: Duration,
    pub per_attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: Duration::from_secs(1),
            exponential_base: 2.0,
            floor: Duration::from_secs(4),
            ceiling: Duration::from_secs(10),
            per_attempt_timeout: Duration::from_secs(25),
        }
    }
}

impl RetryPolicy {
    /// Wait before the retry that follows attempt `attempt_index` (0-based):
    /// `multiplier * base^index`, clamped to `[floor, ceiling]`. A server
    /// supplied retry hint can lengthen the wait but never past the ceiling.
    pub fn delay_for(&self, attempt_index: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
        let raw = self.multiplier.as_secs_f64() * self.exponential_base.powi(exponent);
        let computed = Duration::try_from_secs_f64(raw).unwrap_or(self.ceiling);

        let mut delay = computed.max(self.floor);
        if let Some(hint) = retry_after {
            delay = delay.max(hint);
        }
        delay.min(self.ceiling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Terminal,
}

/// Decides whether a failure is worth retrying
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &LlmError) -> FailureClass;
}

/// Classifies by `LlmErrorKind::is_retryable`
#[derive(Debug, Default, Clone, Copy)]
pub struct KindClassifier;

impl ErrorClassifier for KindClassifier {
    fn classify(&self, error: &LlmError) -> FailureClass {
        if error.kind.is_retryable() {
            FailureClass::Transient
        } else {
            FailureClass::Terminal
        }
    }
}

impl<F> ErrorClassifier for F
where
    F: Fn(&LlmError) -> FailureClass + Send + Sync,
{
    fn classify(&self, error: &LlmError) -> FailureClass {
        self(error)
    }
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("terminal failure on attempt {attempts}: {source}")]
    Terminal {
        attempts: u32,
        #[source]
        source: LlmError,
    },
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: LlmError,
    },
}

impl InvocationError {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Terminal { attempts, .. } | Self::RetriesExhausted { attempts, .. } => *attempts,
        }
    }

    pub fn kind(&self) -> LlmErrorKind {
        match self {
            Self::Terminal { source, .. } => source.kind,
            Self::RetriesExhausted { last, .. } => last.kind,
        }
    }
}

pub struct ResilientInvoker {
    policy: RetryPolicy,
    classifier: Arc<dyn ErrorClassifier>,
}

impl ResilientInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            classifier: Arc::new(KindClassifier),
        }
    }

    #[allow(dead_code)]
    pub fn with_classifier(mut self, classifier: impl ErrorClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `call` until it succeeds, fails terminally, or attempts run out.
    pub async fn invoke<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, InvocationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let timeout = self.policy.per_attempt_timeout;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match tokio::time::timeout(timeout, call()).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "Call recovered after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                Err(_) => LlmError::timeout(format!(
                    "No response within {}ms",
                    timeout.as_millis()
                )),
            };

            match self.classifier.classify(&error) {
                FailureClass::Terminal => {
                    tracing::warn!(
                        operation,
                        attempt,
                        kind = ?error.kind,
                        error = %error,
                        "Terminal failure, not retrying"
                    );
                    return Err(InvocationError::Terminal {
                        attempts: attempt,
                        source: error,
                    });
                }
                FailureClass::Transient if attempt >= max_attempts => {
                    tracing::error!(
                        operation,
                        attempts = attempt,
                        kind = ?error.kind,
                        error = %error,
                        "Retries exhausted"
                    );
                    return Err(InvocationError::RetriesExhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                FailureClass::Transient => {
                    let delay = self.policy.delay_for(attempt - 1, error.retry_after);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = %delay.as_millis(),
                        kind = ?error.kind,
                        error = %error,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
