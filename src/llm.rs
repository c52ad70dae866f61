//! Remote completion service abstraction
//!
//! The completion backend is an opaque collaborator: given a model id and a
//! prompt it returns text, or an error classified for retry decisions.

mod error;
mod openai;
mod types;

#[cfg(test)]
mod proptests;

pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAiCompatibleService;
#[allow(unused_imports)]
pub use types::{Completion, CompletionRequest, Usage};

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion providers
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Make a single completion request (no retries at this layer)
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    /// Provider name, for logs
    fn provider(&self) -> &str;
}

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        (**self).complete(request).await
    }

    fn provider(&self) -> &str {
        (**self).provider()
    }
}

/// Logging wrapper for completion services
pub struct LoggingService {
    inner: Arc<dyn CompletionService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn CompletionService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CompletionService for LoggingService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(completion) => {
                tracing::info!(
                    provider = %self.inner.provider(),
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    input_tokens = completion.usage.input_tokens,
                    output_tokens = completion.usage.output_tokens,
                    "Completion request finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    provider = %self.inner.provider(),
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Completion request failed"
                );
            }
        }

        result
    }

    fn provider(&self) -> &str {
        self.inner.provider()
    }
}
