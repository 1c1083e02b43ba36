use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde_json::Value;

use crate::error::AppError;
use crate::handlers::{as_payload, new_request_id, sticky_key, unix_timestamp};
use crate::orchestrator;
use crate::sse_adapter;
use crate::state::AppState;
use crate::streaming;

/// `POST /v1/chat/completions`. The canonical payload is always sent
/// upstream with `stream=true` (§4.I) so the same adapter handles both
/// cases; a client that asked for `stream: false` instead gets every
/// adapted chunk collected into one completion object.
pub async fn chat_completions(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Result<Response, AppError> {
    let mut req = translator::parse_chat_completions_request(&body)?;
    let wants_stream = req.stream.unwrap_or(false);
    let include_usage = req.stream_options.as_ref().and_then(|o| o.include_usage).unwrap_or(false);
    req.stream = Some(true);

    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(new_request_id);
    let sticky = sticky_key(&state, &req);
    let model = req.model.clone();
    let payload = as_payload(&req);

    let selected = orchestrator::acquire(&state, &payload, sticky.as_deref(), Some(&request_id)).await?;
    let completion_id = format!("chatcmpl-{}", uuid::Uuid::new_v4().as_simple());
    let created = unix_timestamp();
    let adapter = sse_adapter::chat_adapter(completion_id.clone(), model.clone(), created, include_usage);

    if wants_stream {
        return streaming::dispatch(state, selected.account, selected.response, adapter, std::sync::Arc::new(sse_adapter::format_chat_event)).await;
    }

    let upstream_client::UpstreamResponse { headers: response_headers, mut stream } = selected.response;
    let header_harvest = crate::harvest::from_headers(&response_headers);
    if !header_harvest.is_empty() {
        crate::harvest::apply_and_persist(&state, &selected.account, header_harvest, unix_timestamp()).await?;
    }

    let mut chunks: Vec<Value> = Vec::new();
    while let Some(event) = stream.next().await {
        let event = event.map_err(|e| AppError::upstream_error(e.to_string()))?;
        if let Some(harvested) = crate::harvest::from_event(&event) {
            crate::harvest::apply_and_persist(&state, &selected.account, harvested, unix_timestamp()).await?;
        }
        if event.get("type").and_then(Value::as_str) == Some("response.failed") {
            state.balancer.release(&selected.account.id);
            let message = event
                .get("response")
                .and_then(|r| r.get("error"))
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("upstream reported a failed response");
            return Err(AppError::upstream_error(message));
        }
        chunks.extend(adapter(&event));
    }
    state.balancer.release(&selected.account.id);

    let completion = sse_adapter::collect_chat_completion(completion_id, model, created, &chunks);
    Ok(Json(completion).into_response())
}
