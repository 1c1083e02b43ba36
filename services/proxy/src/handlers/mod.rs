mod chat;
mod models;
mod responses;
mod usage;

pub use chat::chat_completions;
pub use models::list_models;
pub use responses::{legacy_responses, native_responses, responses_compact};
pub use usage::codex_usage;

use serde_json::Value;
use uuid::Uuid;

use crate::state::AppState;

/// Derive the balancer's sticky key from a canonical request, when the
/// dashboard has the sticky-threads feature enabled: `conversation` takes
/// priority over `previous_response_id` as the opaque client fingerprint
/// (§3, StickySession).
pub(crate) fn sticky_key(state: &AppState, req: &translator::ResponsesRequest) -> Option<String> {
    if !state.sticky_threads_enabled {
        return None;
    }
    req.conversation.clone().or_else(|| req.previous_response_id.clone())
}

pub(crate) fn new_request_id() -> String {
    format!("req_{}", Uuid::new_v4().as_simple())
}

pub(crate) fn unix_timestamp() -> i64 {
    crate::orchestrator::unix_now()
}

pub(crate) fn as_payload(req: &translator::ResponsesRequest) -> Value {
    translator::to_upstream_json(req)
}
