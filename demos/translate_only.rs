//! Demonstrate the translation layer without a server.
//!
//! Usage:
//!   `cargo run --example translate_only`

use chat_bridge::logging::SharedLogger;
use chat_bridge::translate::api_types::{ChatCompletionRequest, ChatMessage};
use chat_bridge::translate::request::chat_to_upstream;
use chat_bridge::translate::response::upstream_to_chat;
use chat_bridge::translate::streaming::StreamRelay;
use chat_bridge::translate::upstream_types::UpstreamResponse;
use serde_json::json;
use std::collections::HashMap;

fn main() {
    // An inbound chat-completion request, most sampling parameters omitted
    let request = ChatCompletionRequest {
        model: "gpt-4".to_string(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: json!("You are a geography expert. Be concise."),
            },
            ChatMessage {
                role: "user".to_string(),
                content: json!("What is the capital of France?"),
            },
        ],
        temperature: None,
        max_tokens: Some(256),
        top_p: None,
        frequency_penalty: None,
        presence_penalty: None,
        stream: Some(false),
    };

    // Translate to the upstream's shape: alias resolution plus defaults
    let aliases = HashMap::from([("gpt-4".to_string(), "deepseek-reasoner".to_string())]);
    let upstream_req = chat_to_upstream(&request, &aliases, "deepseek-chat");

    println!("=== Translated request (upstream shape) ===");
    println!("{}", serde_json::to_string_pretty(&upstream_req).unwrap());

    // Simulate an upstream response and translate back
    let upstream_resp: UpstreamResponse = serde_json::from_value(json!({
        "id": "up-demo",
        "object": "chat.completion",
        "created": 0,
        "model": "deepseek-reasoner",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "The capital of France is Paris."},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 42, "completion_tokens": 8, "total_tokens": 50}
    }))
    .unwrap();

    let response = upstream_to_chat(&upstream_resp, &request.model).unwrap();

    println!();
    println!("=== Translated response (inbound shape) ===");
    println!("{}", serde_json::to_string_pretty(&response).unwrap());

    // Drive the stream relay over raw SSE bytes: one event split mid-JSON
    // across network chunks, one malformed event in between
    println!();
    println!("=== Stream relay demo ===");

    let logger = SharedLogger::in_memory();
    let mut relay = StreamRelay::new(&request.model, logger.clone());

    let first: &[u8] = b"data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Pa\"},\"finish_reason\":null}]}\n\ndata: {\"choices\":[{\"ind";
    let second: &[u8] = b"ex\":0,\"delta\":{\"content\":\"ris\"},\"finish_reason\":null}]}\n\ndata: {oops}\n\ndata: [DONE]\n\n";

    for (i, chunk) in [first, second].into_iter().enumerate() {
        for frame in relay.process(chunk) {
            print!("  network chunk {} -> {}", i, frame);
        }
    }

    let stats = relay.stats();
    println!();
    println!(
        "Done: {} events forwarded, {} skipped, no network calls made.",
        stats.forwarded(),
        stats.skipped()
    );

    println!();
    println!("Relay log trail:");
    for entry in logger.recent(10) {
        println!("  [{:?}] {}: {}", entry.level, entry.component, entry.message);
    }
}
