//! Rewrites canonical `response.*` SSE events into OpenAI
//! `chat.completion.chunk` events for the `/v1/chat/completions`
//! surface (§4.I, §7). The Chat Completions dialect always forces
//! `stream=true` on the canonical payload internally so this adapter can
//! run uniformly, regardless of whether the caller itself asked to
//! stream — non-streaming callers just get the adapted chunks collected
//! into a single completion object instead (see [`collect_chat_completion`]).

use serde_json::{Value, json};

use crate::streaming::Adapter;

/// One chat-completion-chunk adapter closed over a fixed `id`/`model`/
/// `created` triple and whether a trailing usage-only chunk should be
/// emitted before `[DONE]`.
pub fn chat_adapter(id: String, model: String, created: i64, include_usage: bool) -> Adapter {
    std::sync::Arc::new(move |event: &Value| adapt_event(event, &id, &model, created, include_usage))
}

fn adapt_event(event: &Value, id: &str, model: &str, created: i64, include_usage: bool) -> Vec<Value> {
    let event_type = event.get("type").and_then(Value::as_str).unwrap_or_default();

    match event_type {
        "response.output_text.delta" => {
            let delta = event.get("delta").and_then(Value::as_str).unwrap_or_default();
            vec![chunk(id, model, created, json!({"content": delta}), None)]
        }
        "response.completed" | "response.incomplete" => {
            let finish_reason = if event_type == "response.incomplete" { "length" } else { "stop" };
            let mut chunks = vec![chunk(id, model, created, json!({}), Some(finish_reason))];
            if include_usage {
                if let Some(usage) = event.get("response").and_then(|r| r.get("usage")) {
                    chunks.push(usage_chunk(id, model, created, usage));
                }
            }
            chunks.push(json!({"type": "", "__raw_done__": true}));
            chunks
        }
        "response.failed" => vec![event.clone()],
        _ => vec![],
    }
}

fn chunk(id: &str, model: &str, created: i64, delta: Value, finish_reason: Option<&str>) -> Value {
    json!({
        "id": id,
        "object": "chat.completion.chunk",
        "created": created,
        "model": model,
        "choices": [{
            "index": 0,
            "delta": delta,
            "finish_reason": finish_reason,
        }],
    })
}

fn usage_chunk(id: &str, model: &str, created: i64, usage: &Value) -> Value {
    json!({
        "id": id,
        "object": "chat.completion.chunk",
        "created": created,
        "model": model,
        "choices": [],
        "usage": usage,
    })
}

/// Render one adapted value as an SSE frame, translating the
/// `__raw_done__` sentinel into the literal `data: [DONE]\n\n` frame
/// OpenAI's own streaming format ends every stream with.
pub fn format_chat_event(value: &Value) -> String {
    if value.get("__raw_done__").is_some() {
        return "data: [DONE]\n\n".to_string();
    }
    upstream_client::format_sse_event(value)
}

/// Build a single (non-streaming) chat completion object by draining
/// every adapted chunk and reassembling the message text, matching what
/// a client that passed `stream: false` expects back.
pub fn collect_chat_completion(id: String, model: String, created: i64, chunks: &[Value]) -> Value {
    let mut content = String::new();
    let mut finish_reason = "stop".to_string();
    let mut usage = None;

    for chunk in chunks {
        if chunk.get("__raw_done__").is_some() {
            continue;
        }
        if let Some(choice) = chunk.get("choices").and_then(|c| c.get(0)) {
            if let Some(delta) = choice.get("delta").and_then(|d| d.get("content")).and_then(Value::as_str) {
                content.push_str(delta);
            }
            if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
                finish_reason = reason.to_string();
            }
        }
        if let Some(u) = chunk.get("usage") {
            usage = Some(u.clone());
        }
    }

    json!({
        "id": id,
        "object": "chat.completion",
        "created": created,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": finish_reason,
        }],
        "usage": usage,
    })
}
