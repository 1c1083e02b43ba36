use axum::Json;
use serde_json::{Value, json};

/// `GET /v1/models`. There is no upstream model-listing endpoint to
/// proxy — the proxy fronts a single fixed model family — so this
/// returns a static catalog in the OpenAI list shape.
const MODELS: &[&str] = &["gpt-5.1", "gpt-5", "gpt-5-codex"];

pub async fn list_models() -> Json<Value> {
    let data: Vec<Value> = MODELS
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "object": "model",
                "created": 0,
                "owned_by": "codex-lb",
                "metadata": {},
            })
        })
        .collect();

    Json(json!({"object": "list", "data": data}))
}
