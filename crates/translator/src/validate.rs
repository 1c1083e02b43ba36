//! Field-level validation shared by the native `responses` dialect and
//! the translated-from-chat-completions path.

use serde_json::Value;

use crate::error::{Result, ValidationError};
use crate::types::{RESPONSES_INCLUDE_ALLOWLIST, ResponsesRequest};

pub fn validate_responses_request(req: &ResponsesRequest) -> Result<()> {
    if req.model.is_empty() {
        return Err(ValidationError::on_field("model", "model must not be empty"));
    }
    validate_input(&req.input)?;

    for entry in &req.include {
        if !RESPONSES_INCLUDE_ALLOWLIST.contains(&entry.as_str()) {
            return Err(ValidationError::on_field(
                "include",
                format!("unsupported include value: {entry}"),
            ));
        }
    }

    if let Some(truncation) = &req.truncation {
        if truncation != "auto" && truncation != "disabled" {
            return Err(ValidationError::on_field("truncation", "truncation must be 'auto' or 'disabled'"));
        }
    }

    if req.store {
        return Err(ValidationError::on_field("store", "store must be false"));
    }

    if req.conversation.is_some() && req.previous_response_id.is_some() {
        return Err(ValidationError::new(
            "provide either 'conversation' or 'previous_response_id', not both",
        ));
    }

    Ok(())
}

pub fn validate_input(input: &Value) -> Result<()> {
    match input {
        Value::String(_) | Value::Array(_) => Ok(()),
        _ => Err(ValidationError::on_field("input", "input must be a string or array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponsesRequest;
    use serde_json::json;

    fn base() -> ResponsesRequest {
        ResponsesRequest {
            model: "gpt-5".to_string(),
            instructions: String::new(),
            input: json!("hello"),
            tools: vec![],
            tool_choice: None,
            parallel_tool_calls: None,
            reasoning: None,
            store: false,
            stream: None,
            include: vec![],
            conversation: None,
            previous_response_id: None,
            truncation: None,
            prompt_cache_key: None,
            text: None,
            stream_options: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(validate_responses_request(&base()).is_ok());
    }

    #[test]
    fn empty_model_is_rejected() {
        let mut req = base();
        req.model = String::new();
        assert!(validate_responses_request(&req).is_err());
    }

    #[test]
    fn non_string_non_array_input_is_rejected() {
        let mut req = base();
        req.input = json!(42);
        assert!(validate_responses_request(&req).is_err());
    }

    #[test]
    fn array_input_is_accepted() {
        let mut req = base();
        req.input = json!([{"role": "user", "content": "hi"}]);
        assert!(validate_responses_request(&req).is_ok());
    }

    #[test]
    fn unknown_include_value_is_rejected() {
        let mut req = base();
        req.include = vec!["bogus.field".to_string()];
        assert!(validate_responses_request(&req).is_err());
    }

    #[test]
    fn allowlisted_include_value_is_accepted() {
        let mut req = base();
        req.include = vec!["reasoning.encrypted_content".to_string()];
        assert!(validate_responses_request(&req).is_ok());
    }

    #[test]
    fn invalid_truncation_is_rejected() {
        let mut req = base();
        req.truncation = Some("sometimes".to_string());
        assert!(validate_responses_request(&req).is_err());
    }

    #[test]
    fn store_true_is_rejected() {
        let mut req = base();
        req.store = true;
        assert!(validate_responses_request(&req).is_err());
    }

    #[test]
    fn conversation_and_previous_response_id_are_mutually_exclusive() {
        let mut req = base();
        req.conversation = Some("conv-1".to_string());
        req.previous_response_id = Some("resp-1".to_string());
        assert!(validate_responses_request(&req).is_err());
    }
}
