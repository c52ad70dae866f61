//! Property-based tests for the completion wire translation
//!
//! These tests verify that translation between our request/response types
//! and the chat-completions wire format preserves key invariants:
//! - Empty responses are rejected
//! - Content is preserved through translation
//! - HTTP failures classify consistently with their status

use super::openai::{ChatResponse, OpenAiCompatibleService};
use super::types::CompletionRequest;
use super::{LlmError, LlmErrorKind};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Strategies
// ============================================================================

fn arb_request() -> impl Strategy<Value = CompletionRequest> {
    (
        "[a-z0-9-]{1,20}",
        "[a-zA-Z0-9 _.!?,]{1,100}",
        proptest::option::of("[a-zA-Z0-9 _.!?,]{1,100}"),
        proptest::option::of(1u32..4096),
    )
        .prop_map(|(model, prompt, system, max_tokens)| {
            let request = CompletionRequest::new(model, prompt).with_max_tokens(max_tokens);
            match system {
                Some(system) => request.with_system(system),
                None => request,
            }
        })
}

fn response_with(content: Option<&str>) -> ChatResponse {
    serde_json::from_value(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
    .unwrap()
}

proptest! {
    // ========================================================================
    // Normalization
    // ========================================================================

    #[test]
    fn prop_normalize_rejects_blank_content(blank in "[ \t\n]{0,10}") {
        let result = OpenAiCompatibleService::normalize_response(response_with(Some(&blank)));
        prop_assert!(result.is_err());
        prop_assert_eq!(result.unwrap_err().kind, LlmErrorKind::Unknown);
    }

    #[test]
    fn prop_normalize_preserves_content(text in "[a-zA-Z0-9_.!?,][a-zA-Z0-9 _.!?,]{0,100}") {
        let completion =
            OpenAiCompatibleService::normalize_response(response_with(Some(&text))).unwrap();
        prop_assert_eq!(completion.text, text);
    }

    // ========================================================================
    // Translation
    // ========================================================================

    #[test]
    fn prop_translate_ends_with_user_prompt(request in arb_request()) {
        let wire = OpenAiCompatibleService::translate_request(&request);
        let last = wire.messages.last().unwrap();
        prop_assert_eq!(&last.role, "user");
        prop_assert_eq!(&last.content, &request.prompt);
        prop_assert_eq!(wire.messages.len(), 1 + usize::from(request.system.is_some()));
        prop_assert_eq!(wire.max_tokens, request.max_tokens);
        prop_assert_eq!(&wire.model, &request.model);
    }

    #[test]
    fn prop_translated_request_serializes(request in arb_request()) {
        let wire = OpenAiCompatibleService::translate_request(&request);
        let value = serde_json::to_value(&wire).unwrap();
        prop_assert_eq!(value["stream"].as_bool(), Some(false));
        prop_assert_eq!(value["messages"].as_array().map(Vec::len), Some(wire.messages.len()));
    }

    // ========================================================================
    // Failure classification
    // ========================================================================

    #[test]
    fn prop_classification_matches_status(status in 400u16..600, body in "[a-zA-Z ]{0,40}") {
        let err = OpenAiCompatibleService::classify_failure(status, &body, None);
        let expected = LlmError::from_status(status, String::new()).kind;
        prop_assert_eq!(err.kind, expected);
        prop_assert_eq!(
            err.kind.is_retryable(),
            status == 408 || status == 429 || status >= 500
        );
        prop_assert!(err.message.contains(&status.to_string()));
    }
}
