//! Chat Completions dialect: validation plus translation into the
//! canonical [`ResponsesRequest`].

use serde_json::{Map, Value, json};

use crate::coercion::{coerce_messages, drop_oversized_images};
use crate::error::{Result, ValidationError};
use crate::types::{ChatCompletionsRequest, ChatResponseFormat, ResponsesRequest, ResponsesTextControls, ResponsesTextFormat};
use crate::validate::validate_responses_request;

pub fn validate_chat_request(req: &ChatCompletionsRequest) -> Result<()> {
    if req.messages.is_empty() {
        return Err(ValidationError::on_field("messages", "'messages' must be a non-empty list"));
    }
    for message in &req.messages {
        let obj = message
            .as_object()
            .ok_or_else(|| ValidationError::on_field("messages", "'messages' must contain objects"))?;
        let role = obj.get("role").and_then(Value::as_str);
        let content = obj.get("content").cloned().unwrap_or(Value::Null);
        match role {
            Some("system") | Some("developer") => ensure_text_only_content(&content, role.unwrap())?,
            Some("user") => validate_user_content(&content)?,
            _ => {}
        }
    }
    Ok(())
}

fn ensure_text_only_content(content: &Value, role: &str) -> Result<()> {
    let is_text_only = match content {
        Value::Null | Value::String(_) => true,
        Value::Array(parts) => parts.iter().all(|part| match part {
            Value::String(_) => true,
            Value::Object(obj) => {
                let part_type = obj.get("type").and_then(Value::as_str);
                matches!(part_type, None | Some("text")) && obj.get("text").is_some_and(Value::is_string)
            }
            _ => false,
        }),
        Value::Object(obj) => {
            let part_type = obj.get("type").and_then(Value::as_str);
            matches!(part_type, None | Some("text")) && obj.get("text").is_some_and(Value::is_string)
        }
        _ => false,
    };
    if is_text_only {
        Ok(())
    } else {
        Err(ValidationError::new(format!("{role} messages must be text-only")))
    }
}

fn validate_user_content(content: &Value) -> Result<()> {
    match content {
        Value::Null | Value::String(_) => Ok(()),
        Value::Array(parts) => {
            for part in parts {
                validate_user_content_part(part)?;
            }
            Ok(())
        }
        other => validate_user_content_part(other),
    }
}

fn validate_user_content_part(part: &Value) -> Result<()> {
    if part.is_string() {
        return Ok(());
    }
    let obj = part
        .as_object()
        .ok_or_else(|| ValidationError::new("user message content parts must be objects"))?;
    let part_type = obj
        .get("type")
        .and_then(Value::as_str)
        .or(if obj.contains_key("text") { Some("text") } else { None })
        .unwrap_or("");

    match part_type {
        "text" => {
            if obj.get("text").is_some_and(Value::is_string) {
                Ok(())
            } else {
                Err(ValidationError::new("text content parts must include a string 'text'"))
            }
        }
        "image_url" => {
            let has_url = obj
                .get("image_url")
                .and_then(Value::as_object)
                .is_some_and(|m| m.get("url").is_some_and(Value::is_string));
            if has_url {
                Ok(())
            } else {
                Err(ValidationError::new("image content parts must include image_url.url"))
            }
        }
        "input_audio" => {
            let format = obj.get("input_audio").and_then(Value::as_object).and_then(|m| m.get("format")).and_then(Value::as_str);
            if matches!(format, Some("wav") | Some("mp3")) {
                Ok(())
            } else {
                Err(ValidationError::new("audio input format must be 'wav' or 'mp3'"))
            }
        }
        "file" => {
            if obj.get("file").is_some_and(Value::is_object) {
                Ok(())
            } else {
                Err(ValidationError::new("file content parts must include file metadata"))
            }
        }
        other => Err(ValidationError::new(format!("unsupported user content part type: {other}"))),
    }
}

fn normalize_chat_tools(tools: &[Value]) -> Vec<Value> {
    tools
        .iter()
        .filter_map(|tool| {
            let obj = tool.as_object()?;
            let tool_type = obj.get("type").and_then(Value::as_str);
            if let Some(function) = obj.get("function").and_then(Value::as_object) {
                let name = function.get("name").and_then(Value::as_str)?;
                return Some(json!({
                    "type": tool_type.unwrap_or("function"),
                    "name": name,
                    "description": function.get("description").cloned().unwrap_or(Value::Null),
                    "parameters": function.get("parameters").cloned().unwrap_or(Value::Null),
                }));
            }
            if obj.get("name").is_some_and(Value::is_string) {
                return Some(tool.clone());
            }
            None
        })
        .collect()
}

fn normalize_tool_choice(tool_choice: Option<Value>) -> Option<Value> {
    let choice = tool_choice?;
    let Some(obj) = choice.as_object() else { return Some(choice) };
    if let Some(function) = obj.get("function").and_then(Value::as_object) {
        if let Some(name) = function.get("name").and_then(Value::as_str) {
            let tool_type = obj.get("type").and_then(Value::as_str).unwrap_or("function");
            return Some(json!({"type": tool_type, "name": name}));
        }
    }
    Some(choice)
}

fn response_format_to_text_format(response_format: &Value) -> Result<ResponsesTextFormat> {
    match response_format {
        Value::String(s) => match s.as_str() {
            "json_object" | "text" => Ok(ResponsesTextFormat { r#type: Some(s.clone()), ..Default::default() }),
            "json_schema" => Err(ValidationError::new(
                "'response_format' must include 'json_schema' when type is 'json_schema'",
            )),
            other => Err(ValidationError::new(format!("unsupported response_format.type: {other}"))),
        },
        Value::Object(_) => {
            let parsed: ChatResponseFormat = serde_json::from_value(response_format.clone())
                .map_err(|e| ValidationError::new(format!("invalid response_format: {e}")))?;
            match parsed.r#type.as_str() {
                "json_schema" => {
                    let schema = parsed
                        .json_schema
                        .ok_or_else(|| ValidationError::new("'response_format.json_schema' is required when type is 'json_schema'"))?;
                    Ok(ResponsesTextFormat {
                        r#type: Some(parsed.r#type),
                        schema: schema.schema,
                        name: schema.name,
                        strict: schema.strict,
                    })
                }
                "json_object" | "text" => Ok(ResponsesTextFormat { r#type: Some(parsed.r#type), ..Default::default() }),
                other => Err(ValidationError::new(format!("unsupported response_format.type: {other}"))),
            }
        }
        _ => Err(ValidationError::new("'response_format' must be a string or object")),
    }
}

/// Translate a validated [`ChatCompletionsRequest`] into the canonical
/// [`ResponsesRequest`], then run it through the same validation the
/// native dialect goes through.
pub fn to_responses_request(req: ChatCompletionsRequest) -> Result<ResponsesRequest> {
    validate_chat_request(&req)?;

    let sanitized_messages: Vec<Value> = req
        .messages
        .iter()
        .map(|message| {
            let Some(obj) = message.as_object() else { return message.clone() };
            if obj.get("role").and_then(Value::as_str) != Some("user") {
                return message.clone();
            }
            let mut updated = obj.clone();
            if let Some(content) = obj.get("content") {
                updated.insert("content".to_string(), drop_oversized_images(content));
            }
            Value::Object(updated)
        })
        .collect();

    let (instructions, input) = coerce_messages("", &sanitized_messages)?;

    let tools = normalize_chat_tools(&req.tools);
    let tool_choice = normalize_tool_choice(req.tool_choice);

    let mut text: Option<ResponsesTextControls> = None;
    if let Some(response_format) = &req.response_format {
        if req.extra.contains_key("text") {
            return Err(ValidationError::on_field(
                "response_format",
                "'response_format' cannot be combined with 'text'",
            ));
        }
        let format = response_format_to_text_format(response_format)?;
        text = Some(ResponsesTextControls {
            format: Some(format),
            ..Default::default()
        });
    }

    let reasoning = req.reasoning_effort.map(|effort| crate::types::ResponsesReasoning {
        effort: Some(effort),
        ..Default::default()
    });

    let stream_options = req
        .stream_options
        .as_ref()
        .and_then(|opts| opts.include_obfuscation)
        .map(|include_obfuscation| json!({"include_obfuscation": include_obfuscation}));

    let mut extra: Map<String, Value> = req.extra;
    extra.remove("max_tokens");
    extra.remove("max_completion_tokens");
    extra.remove("store");

    let translated = ResponsesRequest {
        model: req.model,
        instructions,
        input: Value::Array(input),
        tools,
        tool_choice,
        parallel_tool_calls: req.parallel_tool_calls,
        reasoning,
        store: false,
        stream: req.stream,
        include: vec![],
        conversation: None,
        previous_response_id: None,
        truncation: None,
        prompt_cache_key: None,
        text,
        stream_options,
        extra,
    };

    validate_responses_request(&translated)?;
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chat_request(messages: Vec<Value>) -> ChatCompletionsRequest {
        ChatCompletionsRequest {
            model: "gpt-5".to_string(),
            messages,
            tools: vec![],
            tool_choice: None,
            parallel_tool_calls: None,
            stream: None,
            response_format: None,
            reasoning_effort: None,
            stream_options: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn empty_messages_is_rejected() {
        assert!(validate_chat_request(&chat_request(vec![])).is_err());
    }

    #[test]
    fn system_message_with_image_is_rejected() {
        let req = chat_request(vec![json!({"role": "system", "content": [{"type": "image_url", "image_url": {"url": "x"}}]})]);
        assert!(validate_chat_request(&req).is_err());
    }

    #[test]
    fn basic_translation_produces_instructions_and_input() {
        let req = chat_request(vec![
            json!({"role": "system", "content": "be helpful"}),
            json!({"role": "user", "content": "hi"}),
        ]);
        let translated = to_responses_request(req).unwrap();
        assert_eq!(translated.instructions, "be helpful");
        assert_eq!(translated.store, false);
        assert!(translated.input.is_array());
    }

    #[test]
    fn function_tools_are_flattened() {
        let mut req = chat_request(vec![json!({"role": "user", "content": "hi"})]);
        req.tools = vec![json!({
            "type": "function",
            "function": {"name": "lookup", "description": "look things up", "parameters": {"type": "object"}},
        })];
        let translated = to_responses_request(req).unwrap();
        assert_eq!(translated.tools[0]["name"], "lookup");
        assert_eq!(translated.tools[0]["type"], "function");
    }

    #[test]
    fn reasoning_effort_becomes_reasoning_object() {
        let mut req = chat_request(vec![json!({"role": "user", "content": "hi"})]);
        req.reasoning_effort = Some("high".to_string());
        let translated = to_responses_request(req).unwrap();
        assert_eq!(translated.reasoning.unwrap().effort.as_deref(), Some("high"));
    }

    #[test]
    fn json_object_response_format_sets_text_format() {
        let mut req = chat_request(vec![json!({"role": "user", "content": "hi"})]);
        req.response_format = Some(json!("json_object"));
        let translated = to_responses_request(req).unwrap();
        assert_eq!(translated.text.unwrap().format.unwrap().r#type.as_deref(), Some("json_object"));
    }

    #[test]
    fn json_schema_response_format_requires_schema_object() {
        let mut req = chat_request(vec![json!({"role": "user", "content": "hi"})]);
        req.response_format = Some(json!("json_schema"));
        assert!(to_responses_request(req).is_err());
    }

    #[test]
    fn json_schema_object_response_format_is_translated() {
        let mut req = chat_request(vec![json!({"role": "user", "content": "hi"})]);
        req.response_format = Some(json!({
            "type": "json_schema",
            "json_schema": {"name": "answer", "schema": {"type": "object"}, "strict": true},
        }));
        let translated = to_responses_request(req).unwrap();
        let format = translated.text.unwrap().format.unwrap();
        assert_eq!(format.name.as_deref(), Some("answer"));
        assert_eq!(format.strict, Some(true));
    }

    #[test]
    fn oversized_inline_image_is_dropped_before_translation() {
        let big = "A".repeat(12_000_000);
        let mut req = chat_request(vec![json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "look"},
                {"type": "image_url", "image_url": {"url": format!("data:image/png;base64,{big}")}},
            ],
        })]);
        req.model = "gpt-5".to_string();
        let translated = to_responses_request(req).unwrap();
        let items = translated.input.as_array().unwrap();
        let content = items[0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "input_text");
    }

    #[test]
    fn response_format_with_explicit_text_is_rejected() {
        let mut req = chat_request(vec![json!({"role": "user", "content": "hi"})]);
        req.response_format = Some(json!("json_object"));
        req.extra.insert("text".to_string(), json!({"format": {"type": "text"}}));
        assert!(to_responses_request(req).is_err());
    }

    #[test]
    fn max_tokens_is_stripped_from_extra() {
        let mut req = chat_request(vec![json!({"role": "user", "content": "hi"})]);
        req.extra.insert("max_tokens".to_string(), json!(100));
        req.extra.insert("temperature".to_string(), json!(0.7));
        let translated = to_responses_request(req).unwrap();
        assert!(!translated.extra.contains_key("max_tokens"));
        assert_eq!(translated.extra.get("temperature"), Some(&json!(0.7)));
    }
}
