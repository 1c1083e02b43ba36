use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::collector;
use crate::error::AppError;
use crate::handlers::{as_payload, new_request_id, sticky_key};
use crate::orchestrator;
use crate::state::AppState;
use crate::streaming;

fn extract_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(new_request_id)
}

/// `POST /backend-api/codex/responses` — the native dialect, always
/// streamed (§6).
pub async fn native_responses(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Result<Response, AppError> {
    let mut req = translator::parse_responses_request(&body)?;
    req.stream = Some(true);

    let request_id = extract_request_id(&headers);
    let sticky = sticky_key(&state, &req);
    let payload = as_payload(&req);

    let selected = orchestrator::acquire(&state, &payload, sticky.as_deref(), Some(&request_id)).await?;
    streaming::dispatch(
        state,
        selected.account,
        selected.response,
        streaming::passthrough_adapter(),
        streaming::passthrough_formatter(),
    )
    .await
}

/// `POST /v1/responses` — legacy dialect: streams when the client set
/// `stream: true`, otherwise drains the SSE into a collected JSON body.
pub async fn legacy_responses(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Result<Response, AppError> {
    let req = translator::parse_legacy_responses_request(&body)?;
    let wants_stream = req.stream.unwrap_or(false);

    let request_id = extract_request_id(&headers);
    let sticky = sticky_key(&state, &req);
    let payload = as_payload(&req);

    let selected = orchestrator::acquire(&state, &payload, sticky.as_deref(), Some(&request_id)).await?;

    if wants_stream {
        return streaming::dispatch(
            state,
            selected.account,
            selected.response,
            streaming::passthrough_adapter(),
            streaming::passthrough_formatter(),
        )
        .await;
    }

    let upstream_client::UpstreamResponse { headers: response_headers, stream } = selected.response;
    let response = collector::collect(&state, &selected.account, &response_headers, stream).await?;
    state.balancer.release(&selected.account.id);
    Ok(Json(response).into_response())
}

/// `POST /backend-api/codex/responses/compact` and
/// `POST /v1/responses/compact` — validated then rejected with 501; no
/// compact-specific upstream endpoint exists to translate into (§4.I).
pub async fn responses_compact(body: axum::body::Bytes) -> Result<Response, AppError> {
    let _req = translator::parse_responses_compact_request(&body)?;
    Err(AppError::not_implemented("compact responses are not supported by this proxy"))
}
