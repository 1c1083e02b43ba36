use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::state::AppState;

/// `GET /api/codex/usage` — current rate-limit snapshot per account, for
/// the dashboard. Errors on this surface render the narrower
/// `{error:{code,message}}` envelope.
pub async fn codex_usage(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let accounts = state.store.accounts.list_all().await.map_err(|e| AppError::from(e).as_dashboard())?;

    let accounts: Vec<Value> = accounts
        .into_iter()
        .map(|account| {
            json!({
                "id": account.id,
                "email": account.email,
                "plan_type": account.plan_type.as_str(),
                "status": account.status,
                "deactivation_reason": account.deactivation_reason,
                "usage": account.usage,
            })
        })
        .collect();

    Ok(Json(json!({"accounts": accounts})))
}
