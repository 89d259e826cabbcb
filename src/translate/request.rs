//! Translate inbound chat-completion requests into the upstream provider's
//! request shape.
//!
//! The inbound model name is always resolved through the alias table: a
//! known alias maps to its upstream model, anything else falls back to the
//! configured default. Sampling parameters are defaulted here, at translation
//! time, so an omitted parameter and an explicitly-supplied default produce
//! the same upstream payload.

use std::collections::HashMap;
use std::hash::BuildHasher;

use super::api_types::ChatCompletionRequest;
use super::upstream_types::UpstreamRequest;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u64 = 2048;
pub const DEFAULT_TOP_P: f64 = 1.0;
pub const DEFAULT_FREQUENCY_PENALTY: f64 = 0.0;
pub const DEFAULT_PRESENCE_PENALTY: f64 = 0.0;

/// Translate an inbound request into an upstream request. Pure function:
/// alias resolution is total (a miss falls back to `default_model`, never an
/// error), messages are copied verbatim, and nothing is validated. A
/// malformed message surfaces later as an upstream error.
pub fn chat_to_upstream<S: BuildHasher>(
    req: &ChatCompletionRequest,
    aliases: &HashMap<String, String, S>,
    default_model: &str,
) -> UpstreamRequest {
    let target_model = aliases
        .get(&req.model)
        .cloned()
        .unwrap_or_else(|| default_model.to_string());

    UpstreamRequest {
        model: target_model,
        messages: req.messages.clone(),
        temperature: req.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        top_p: req.top_p.unwrap_or(DEFAULT_TOP_P),
        frequency_penalty: req.frequency_penalty.unwrap_or(DEFAULT_FREQUENCY_PENALTY),
        presence_penalty: req.presence_penalty.unwrap_or(DEFAULT_PRESENCE_PENALTY),
        stream: req.stream.unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::api_types::ChatMessage;
    use serde_json::json;

    fn simple_request(model: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: json!("Hello"),
            }],
            temperature: None,
            max_tokens: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            stream: None,
        }
    }

    fn alias_table() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("gpt-4".to_string(), "upstream-large".to_string());
        map.insert("gpt-3.5-turbo".to_string(), "upstream-small".to_string());
        map
    }

    #[test]
    fn test_known_alias_resolves() {
        let req = simple_request("gpt-4");
        let result = chat_to_upstream(&req, &alias_table(), "upstream-default");
        assert_eq!(result.model, "upstream-large");
    }

    #[test]
    fn test_unknown_model_falls_back_to_default() {
        let req = simple_request("some-model-nobody-heard-of");
        let result = chat_to_upstream(&req, &alias_table(), "upstream-default");
        assert_eq!(result.model, "upstream-default");
    }

    #[test]
    fn test_inbound_model_never_forwarded_verbatim() {
        // An inbound name that happens to match an upstream id still goes
        // through the table.
        let req = simple_request("upstream-large");
        let result = chat_to_upstream(&req, &alias_table(), "upstream-default");
        assert_eq!(result.model, "upstream-default");
    }

    #[test]
    fn test_sampling_defaults_applied() {
        let req = simple_request("gpt-4");
        let result = chat_to_upstream(&req, &alias_table(), "upstream-default");

        assert_eq!(result.temperature, 0.7);
        assert_eq!(result.max_tokens, 2048);
        assert_eq!(result.top_p, 1.0);
        assert_eq!(result.frequency_penalty, 0.0);
        assert_eq!(result.presence_penalty, 0.0);
        assert!(!result.stream);
    }

    #[test]
    fn test_explicit_defaults_equal_omitted() {
        let omitted = simple_request("gpt-4");

        let mut explicit = simple_request("gpt-4");
        explicit.temperature = Some(DEFAULT_TEMPERATURE);
        explicit.max_tokens = Some(DEFAULT_MAX_TOKENS);
        explicit.top_p = Some(DEFAULT_TOP_P);
        explicit.frequency_penalty = Some(DEFAULT_FREQUENCY_PENALTY);
        explicit.presence_penalty = Some(DEFAULT_PRESENCE_PENALTY);
        explicit.stream = Some(false);

        let aliases = alias_table();
        let a = serde_json::to_value(chat_to_upstream(&omitted, &aliases, "d")).unwrap();
        let b = serde_json::to_value(chat_to_upstream(&explicit, &aliases, "d")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_explicit_parameters_survive() {
        let mut req = simple_request("gpt-4");
        req.temperature = Some(0.2);
        req.max_tokens = Some(64);
        req.stream = Some(true);

        let result = chat_to_upstream(&req, &alias_table(), "upstream-default");
        assert_eq!(result.temperature, 0.2);
        assert_eq!(result.max_tokens, 64);
        assert!(result.stream);
    }

    #[test]
    fn test_messages_preserved_in_order() {
        let mut req = simple_request("gpt-4");
        req.messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: json!("Be terse."),
            },
            ChatMessage {
                role: "user".to_string(),
                content: json!("First"),
            },
            ChatMessage {
                role: "assistant".to_string(),
                content: json!("Second"),
            },
            ChatMessage {
                role: "user".to_string(),
                content: json!([{"type": "text", "text": "Third"}]),
            },
        ];

        let result = chat_to_upstream(&req, &alias_table(), "upstream-default");
        assert_eq!(result.messages.len(), 4);
        let roles: Vec<&str> = result.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(result.messages[1].content, json!("First"));
        assert_eq!(
            result.messages[3].content,
            json!([{"type": "text", "text": "Third"}])
        );
    }

    #[test]
    fn test_foreign_message_fields_dropped() {
        let req: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "hi", "name": "alice", "weird": 42}]
        }))
        .unwrap();

        let result = chat_to_upstream(&req, &alias_table(), "upstream-default");
        let wire = serde_json::to_value(&result.messages[0]).unwrap();
        assert_eq!(wire, json!({"role": "user", "content": "hi"}));
    }
}
