//! Non-streaming collection: walk an entire upstream SSE stream, harvest
//! usage along the way, and surface only the final `response` object —
//! or the upstream's own error — to a client that didn't ask to stream.

use futures::StreamExt;
use serde_json::Value;

use crate::error::AppError;
use crate::harvest;
use crate::orchestrator::unix_now;
use crate::state::AppState;

/// Drain `stream`, harvesting usage from every event and keeping the
/// last `response` object carried by a `response.completed|incomplete|
/// failed` event. On `failed`, renders the upstream's own `error` object
/// through the standard envelope (`no_accounts` maps to 503, anything
/// else to 502).
pub async fn collect(
    state: &AppState,
    account: &store::Account,
    headers: &reqwest::header::HeaderMap,
    mut stream: upstream_client::EventStream,
) -> Result<Value, AppError> {
    let header_harvest = harvest::from_headers(headers);
    if !header_harvest.is_empty() {
        harvest::apply_and_persist(state, account, header_harvest, unix_now()).await?;
    }

    let mut last_response: Option<Value> = None;

    while let Some(event) = stream.next().await {
        let event = event.map_err(|e| AppError::upstream_error(e.to_string()))?;

        if let Some(harvested) = harvest::from_event(&event) {
            harvest::apply_and_persist(state, account, harvested, unix_now()).await?;
        }

        let event_type = event.get("type").and_then(Value::as_str).unwrap_or_default();
        match event_type {
            "response.completed" | "response.incomplete" => {
                if let Some(response) = event.get("response") {
                    last_response = Some(response.clone());
                }
            }
            "response.failed" => {
                return Err(render_failed(&event));
            }
            _ => {}
        }
    }

    last_response.ok_or_else(|| AppError::upstream_error("upstream stream ended without a terminal response event"))
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

    let status = if code == "no_accounts" {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    } else {
        axum::http::StatusCode::BAD_GATEWAY
    };
    AppError::new(status, code, message, Some("upstream_error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_failed_maps_no_accounts_to_service_unavailable() {
        let event = json!({"type": "response.failed", "response": {"error": {"code": "no_accounts", "message": "none left"}}});
        let err = render_failed(&event);
        assert_eq!(err.status, axum::http::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code, "no_accounts");
    }

    #[test]
    fn render_failed_defaults_other_codes_to_bad_gateway() {
        let event = json!({"type": "response.failed", "error": {"code": "server_error", "message": "boom"}});
        let err = render_failed(&event);
        assert_eq!(err.status, axum::http::StatusCode::BAD_GATEWAY);
    }
}
