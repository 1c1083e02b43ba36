//! Streaming pass-through: the "peek first, then prepend" dispatch named
//! in §4.I. The first SSE event is pulled off the stream before any
//! decision is made — if it is itself a `response.failed` event (nothing
//! ever left the account eligible to serve), the request is answered
//! with a plain JSON error instead of opening a stream. Otherwise the
//! peeked event is prepended back onto the stream and passed through
//! unadapted (native/legacy `responses` dialects) or through `adapt`
//! (the Chat Completions chunk adapter), every event harvesting usage
//! along the way.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use balancer::Balancer;
use futures::StreamExt;
use serde_json::Value;

use crate::error::AppError;
use crate::harvest;
use crate::orchestrator::unix_now;
use crate::state::AppState;

/// Maps a single canonical SSE event to zero or more SSE events to
/// actually send to the client. The identity adapter (`vec![event]`) is
/// used for the native/legacy `responses` dialects; the Chat Completions
/// adapter expands one canonical event into one or more `chat.completion
/// .chunk` events.
pub type Adapter = Arc<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

/// Renders one already-adapted value as a wire frame. The native/legacy
/// dialects use [`upstream_client::format_sse_event`] directly; the Chat
/// Completions dialect uses [`crate::sse_adapter::format_chat_event`] so
/// its `[DONE]` sentinel renders correctly.
pub type Formatter = Arc<dyn Fn(&Value) -> String + Send + Sync>;

pub fn passthrough_adapter() -> Adapter {
    Arc::new(|event: &Value| vec![event.clone()])
}

pub fn passthrough_formatter() -> Formatter {
    Arc::new(upstream_client::format_sse_event)
}

/// Peek the first event off `response.stream`; dispatch to a JSON error
/// response if it is a terminal failure with nothing streamed yet,
/// otherwise to a streaming SSE response that forwards (or adapts)
/// every subsequent event.
pub async fn dispatch(
    state: AppState,
    account: store::Account,
    response: upstream_client::UpstreamResponse,
    adapt: Adapter,
    format: Formatter,
) -> Result<Response, AppError> {
    let upstream_client::UpstreamResponse { headers, mut stream } = response;

    let header_harvest = harvest::from_headers(&headers);
    if !header_harvest.is_empty() {
        harvest::apply_and_persist(&state, &account, header_harvest, unix_now()).await?;
    }

    let first = match stream.next().await {
        Some(event) => event.map_err(|e| AppError::upstream_error(e.to_string()))?,
        None => {
            state.balancer.release(&account.id);
            return Err(AppError::upstream_error("upstream stream ended before any event was received"));
        }
    };

    if first.get("type").and_then(Value::as_str) == Some("response.failed") {
        if let Some(harvested) = harvest::from_event(&first) {
            harvest::apply_and_persist(&state, &account, harvested, unix_now()).await?;
        }
        state.balancer.release(&account.id);
        return Err(render_failed(&first));
    }

    Ok(stream_response(state, account, first, stream, adapt, format))
}

fn stream_response(
    state: AppState,
    account: store::Account,
    first: Value,
    rest: upstream_client::EventStream,
    adapt: Adapter,
    format: Formatter,
) -> Response {
    let body = Body::from_stream(async_stream::stream! {
        let _guard = ReleaseGuard {
            balancer: state.balancer.clone(),
            account_id: account.id.clone(),
        };
        let mut stream = rest;
        let mut pending = Some(Ok(first));

        loop {
            let next = match pending.take() {
                Some(event) => Some(event),
                None => stream.next().await,
            };
            let Some(event) = next else { break };

            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Ok::<_, std::convert::Infallible>(bytes::Bytes::from(
                        format(&serde_json::json!({
                            "type": "error",
                            "error": {"code": "upstream_error", "message": e.to_string()},
                        })),
                    ));
                    break;
                }
            };

            if let Some(harvested) = harvest::from_event(&event) {
                let _ = harvest::apply_and_persist(&state, &account, harvested, unix_now()).await;
            }

            for adapted in adapt(&event) {
                yield Ok::<_, std::convert::Infallible>(bytes::Bytes::from(format(&adapted)));
            }
        }
    });

    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

struct ReleaseGuard {
    balancer: Arc<Balancer>,
    account_id: String,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.balancer.release(&self.account_id);
    }
}

fn render_failed(event: &Value) -> AppError {
    let error = event.get("response").and_then(|r| r.get("error")).or_else(|| event.get("error"));
    let code = error
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .unwrap_or("upstream_error")
        .to_string();
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("upstream reported a failed response")
        .to_string();

    let status = if code == "no_accounts" { StatusCode::SERVICE_UNAVAILABLE } else { StatusCode::BAD_GATEWAY };
    AppError::new(status, code, message, Some("upstream_error"))
}
