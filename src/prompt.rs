//! Completion request construction

use crate::conversation::AnswerMode;
use crate::llm::CompletionRequest;
use std::time::Duration;

pub const STANDARD_SYSTEM_PROMPT: &str = "You are a friendly, concise assistant. \
Answer the user's message directly and keep the reply short unless they ask for more.";

pub const CONSULTATION_SYSTEM_PROMPT: &str = "You are an experienced consultant helping \
the user work through a problem they are stuck on. Work systematically: restate the \
problem in one or two sentences, ask the clarifying questions you still need, analyze \
likely causes, then propose concrete next steps the user can take one at a time. \
Never refuse to engage with the topic.";

/// Prefix applied to the user message once deeper exploration was requested
pub const DEEP_EXPLORATION_PREFIX: &str = "Detailed analysis requested: ";

pub fn system_prompt(mode: AnswerMode) -> &'static str {
    match mode {
        AnswerMode::Standard => STANDARD_SYSTEM_PROMPT,
        AnswerMode::Consultation => CONSULTATION_SYSTEM_PROMPT,
    }
}

/// Parameters of one answer call
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions {
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

pub fn build_request(
    mode: AnswerMode,
    deep_exploration: bool,
    model: &str,
    message: &str,
    options: RequestOptions,
) -> CompletionRequest {
    let prompt = if deep_exploration {
        format!("{DEEP_EXPLORATION_PREFIX}{message}")
    } else {
        message.to_string()
    };

    CompletionRequest::new(model, prompt)
        .with_system(system_prompt(mode))
        .with_max_tokens(options.max_tokens)
        .with_timeout(options.timeout)
}
