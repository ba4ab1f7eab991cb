//! Test utilities for integration tests
#![allow(dead_code)]
use std::sync::{Arc, RwLock};

use axum::{Router, body::Body};

use uidl_chat::ai::{ModelClient, OpenAiClient, ReferenceGrammar};
use uidl_chat::api::AppState;
use uidl_chat::api::app;
use uidl_chat::core::AppConfig;

pub const GREETING: &str = "我是UIDL机器人";

pub fn test_config(openai_api_hostname: &str) -> AppConfig {
    AppConfig {
        openai_model: String::from("gpt-4o"),
        openai_api_hostname: openai_api_hostname.to_string(),
        openai_api_key: String::from("test-api-key"),
        grammar_path: None,
        grammar_version: String::from("1.0.0"),
        greeting: String::from(GREETING),
    }
}

/// Creates a test application router that talks to a model provider
/// at `openai_api_hostname` (usually a `mockito` server).
pub fn test_app(openai_api_hostname: &str) -> Router {
    let config = test_config(openai_api_hostname);
    let client: Arc<dyn ModelClient> = Arc::new(OpenAiClient::from_config(&config));
    let grammar = ReferenceGrammar::bundled(&config.grammar_version);
    let app_state = AppState::with_client(config, client, grammar);
    app(Arc::new(RwLock::new(app_state)))
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not utf-8")
}

/// An OpenAI style SSE body that streams `fragments` as content deltas.
pub fn sse_body(fragments: &[&str]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        let chunk = serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion.chunk",
            "created": 1694268190,
            "model": "gpt-4o",
            "choices": [{"index": 0, "delta": {"content": fragment}, "finish_reason": null}]
        });
        out.push_str(&format!("data: {}\n\n", chunk));
    }
    let stop = serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "created": 1694268190,
        "model": "gpt-4o",
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
    });
    out.push_str(&format!("data: {}\n\ndata: [DONE]\n\n", stop));
    out
}

/// An OpenAI style non-streaming completion body.
pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1694268190,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

pub fn chat_request(content: &str) -> String {
    serde_json::json!({"message": {"content": content}}).to_string()
}
