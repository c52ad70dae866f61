//! Model selection
//!
//! Mode governs pipeline behavior; the deep-exploration signal governs the
//! model. The two axes are independent.

use crate::config::ModelsConfig;
use crate::conversation::ConversationState;
use crate::detection::DeepExplorationDetector;

pub struct ModelSelector {
    default_model: String,
    deep_model: String,
    detector: DeepExplorationDetector,
}

impl ModelSelector {
    pub fn new(models: &ModelsConfig, detector: DeepExplorationDetector) -> Self {
        Self {
            default_model: models.default_model.clone(),
            deep_model: models.deep_model.clone(),
            detector,
        }
    }

    /// Pick the model for `message`. A deep-exploration request marks the
    /// conversation (the flag is never cleared here) and selects the deep
    /// model regardless of mode.
    pub fn select(&self, state: &mut ConversationState, message: &str) -> &str {
        if self.detector.detect(message) {
            if !state.deep_exploration_active {
                tracing::info!("Deep exploration requested");
            }
            state.deep_exploration_active = true;
            &self.deep_model
        } else {
            &self.default_model
        }
    }
}
