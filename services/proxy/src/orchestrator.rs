//! The per-request pipeline (component I): select an account, ensure its
//! token is fresh, call upstream, and hand back whatever succeeded first —
//! retrying on another account, up to a bounded number of attempts, on
//! every transient failure along the way.

use axum::http::StatusCode;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

pub struct SelectedCall {
    pub account: store::Account,
    pub response: upstream_client::UpstreamResponse,
}

/// Steps 2-4 of the pipeline. Returns the account that ended up serving
/// the request, plus its upstream response (headers + SSE stream), or an
/// error once every attempt is exhausted.
pub async fn acquire(
    state: &AppState,
    payload: &Value,
    sticky_key: Option<&str>,
    request_id: Option<&str>,
) -> Result<SelectedCall, AppError> {
    let max_attempts = state.orchestrator_max_account_attempts.max(1);
    let mut last_err: Option<AppError> = None;

    for _ in 0..max_attempts {
        let now_unix = unix_now();

        let account = match state.balancer.select(sticky_key).await {
            Ok(account) => account,
            Err(err) => {
                return Err(last_err.unwrap_or_else(|| AppError::from(err)));
            }
        };
        let account_id = account.id.clone();

        let account = match state.auth_manager.ensure_fresh(account, false, now_unix).await {
            Ok(account) => account,
            Err(auth_manager::Error::Deactivated { .. }) => {
                last_err = Some(AppError::upstream_error("account deactivated during token refresh"));
                continue;
            }
            Err(auth_manager::Error::RefreshFailed(e)) => {
                state.balancer.report_transient(&account_id, None, now_unix);
                last_err = Some(AppError::upstream_error(format!("token refresh failed: {e}")));
                continue;
            }
            Err(auth_manager::Error::Crypto(_)) => {
                let _ = state.balancer.report_permanent(&account_id, "integrity").await;
                last_err = Some(AppError::upstream_error("token integrity failure"));
                continue;
            }
            Err(auth_manager::Error::Store(e)) => return Err(AppError::from(e)),
        };

        let access_token = match state.encryptor.decrypt(&account.access_token_encrypted) {
            Ok(token) => token,
            Err(_) => {
                let _ = state.balancer.report_permanent(&account.id, "integrity").await;
                last_err = Some(AppError::upstream_error("token integrity failure"));
                continue;
            }
        };

        match state.upstream.post_responses(payload, &access_token, request_id).await {
            Ok(response) => {
                crate::metrics::record_account_selected(&account.id);
                return Ok(SelectedCall { account, response });
            }
            Err(upstream_client::Error::ProxyResponse { status, body }) => {
                let message = upstream_error_message(&body);
                if status == 429 || (500..600).contains(&status) {
                    crate::metrics::record_upstream_error("proxy_response");
                    state.balancer.report_transient(&account.id, None, unix_now());
                    last_err = Some(AppError::upstream_error(message));
                    continue;
                }
                let status_code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                return Err(AppError::new(status_code, "upstream_error", message, Some("upstream_error")));
            }
            Err(err) => {
                crate::metrics::record_upstream_error("transport");
                state.balancer.report_transient(&account.id, None, unix_now());
                last_err = Some(AppError::upstream_error(err.to_string()));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| AppError::no_accounts("exhausted all account attempts")))
}

fn upstream_error_message(body: &bytes::Bytes) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.get("message")).and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}
