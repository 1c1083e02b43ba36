//! Pure, total, Result-typed translation between the three client
//! dialects (Chat Completions, legacy `/v1/responses`, native
//! `responses`) and the single canonical shape sent upstream.
//!
//! Nothing in this crate performs I/O; every function here is a plain
//! transform over already-parsed JSON.

mod chat;
mod coercion;
mod error;
mod types;
mod validate;

pub use chat::to_responses_request;
pub use error::{Result, ValidationError};
pub use types::{
    ChatCompletionsRequest, ChatResponseFormat, ChatResponseFormatJsonSchema, ChatStreamOptions, ResponsesCompactRequest,
    ResponsesReasoning, ResponsesRequest, ResponsesTextControls, ResponsesTextFormat,
};
pub use validate::{validate_input, validate_responses_request};

use serde_json::Value;

/// Parse and validate a native `responses` request body.
pub fn parse_responses_request(body: &[u8]) -> Result<ResponsesRequest> {
    let req: ResponsesRequest =
        serde_json::from_slice(body).map_err(|e| ValidationError::new(format!("invalid request body: {e}")))?;
    validate_responses_request(&req)?;
    Ok(req)
}

/// Parse and validate a legacy `/v1/responses` body: the same canonical
/// shape as the native dialect, but with the legacy-only `max_output_
/// tokens` field stripped before the payload goes anywhere near upstream
/// (§4.G).
pub fn parse_legacy_responses_request(body: &[u8]) -> Result<ResponsesRequest> {
    let mut req = parse_responses_request(body)?;
    req.extra.remove("max_output_tokens");
    Ok(req)
}

/// Parse and validate a `/responses/compact` body (the orchestrator
/// answers this route with a 501, but the body is still validated so the
/// error echoes a well-formed rejection).
pub fn parse_responses_compact_request(body: &[u8]) -> Result<ResponsesCompactRequest> {
    let req: ResponsesCompactRequest =
        serde_json::from_slice(body).map_err(|e| ValidationError::new(format!("invalid request body: {e}")))?;
    validate_input(&req.input)?;
    Ok(req)
}

/// Parse a Chat Completions body and translate it into the canonical
/// [`ResponsesRequest`].
pub fn parse_chat_completions_request(body: &[u8]) -> Result<ResponsesRequest> {
    let req: ChatCompletionsRequest =
        serde_json::from_slice(body).map_err(|e| ValidationError::new(format!("invalid request body: {e}")))?;
    to_responses_request(req)
}

/// Serialize a canonical request for the upstream POST body.
pub fn to_upstream_json(req: &ResponsesRequest) -> Value {
    serde_json::to_value(req).expect("ResponsesRequest always serializes")
}
