//! Chat Completions message-array → Responses `instructions`/`input` split.
//!
//! `system`/`developer` messages are concatenated (in order, blank-line
//! separated) into `instructions`; everything else becomes a Responses
//! input item, with content parts re-typed into the `input_text` /
//! `output_text` / `input_image` / `input_audio` / `input_file` shapes
//! the Responses API expects.

use serde_json::{Value, json};

use crate::error::{Result, ValidationError};

pub fn coerce_messages(preamble: &str, messages: &[Value]) -> Result<(String, Vec<Value>)> {
    let mut instructions = Vec::new();
    if !preamble.is_empty() {
        instructions.push(preamble.to_string());
    }
    let mut items = Vec::new();

    for message in messages {
        let obj = message
            .as_object()
            .ok_or_else(|| ValidationError::new("'messages' must contain objects"))?;
        let role = obj.get("role").and_then(Value::as_str).unwrap_or("user");
        let content = obj.get("content").cloned().unwrap_or(Value::Null);

        if role == "system" || role == "developer" {
            instructions.push(extract_plain_text(&content)?);
            continue;
        }

        items.push(json!({
            "role": role,
            "content": convert_content_parts(&content, role)?,
        }));
    }

    Ok((instructions.join("\n\n"), items))
}

fn text_part_type(role: &str) -> &'static str {
    if role == "assistant" { "output_text" } else { "input_text" }
}

fn extract_plain_text(content: &Value) -> Result<String> {
    match content {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Array(parts) => {
            let mut out = String::new();
            for part in parts {
                if let Some(s) = part.as_str() {
                    out.push_str(s);
                    continue;
                }
                if let Some(obj) = part.as_object() {
                    if let Some(text) = obj.get("text").and_then(Value::as_str) {
                        out.push_str(text);
                        continue;
                    }
                }
                return Err(ValidationError::new("system/developer messages must be text-only"));
            }
            Ok(out)
        }
        _ => Err(ValidationError::new("system/developer messages must be text-only")),
    }
}

fn convert_content_parts(content: &Value, role: &str) -> Result<Vec<Value>> {
    match content {
        Value::Null => Ok(vec![]),
        Value::String(s) => Ok(vec![json!({"type": text_part_type(role), "text": s})]),
        Value::Array(parts) => parts.iter().map(|part| convert_one_part(part, role)).collect(),
        Value::Object(_) => Ok(vec![convert_one_part(content, role)?]),
        _ => Err(ValidationError::new("unsupported message content shape")),
    }
}

fn convert_one_part(part: &Value, role: &str) -> Result<Value> {
    if let Some(s) = part.as_str() {
        return Ok(json!({"type": text_part_type(role), "text": s}));
    }
    let obj = part
        .as_object()
        .ok_or_else(|| ValidationError::new("message content parts must be objects"))?;

    let part_type = obj
        .get("type")
        .and_then(Value::as_str)
        .or(if obj.contains_key("text") { Some("text") } else { None })
        .unwrap_or("text");

    match part_type {
        "text" => {
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| ValidationError::new("text content parts must include a string 'text'"))?;
            Ok(json!({"type": text_part_type(role), "text": text}))
        }
        "image_url" => {
            let image_url = obj
                .get("image_url")
                .ok_or_else(|| ValidationError::new("image content parts must include image_url.url"))?;
            let url = image_url
                .as_object()
                .and_then(|m| m.get("url"))
                .and_then(Value::as_str)
                .ok_or_else(|| ValidationError::new("image content parts must include image_url.url"))?;
            Ok(json!({"type": "input_image", "image_url": url}))
        }
        "input_audio" => {
            let audio = obj
                .get("input_audio")
                .and_then(Value::as_object)
                .ok_or_else(|| ValidationError::new("audio content parts must include input_audio"))?;
            let format = audio.get("format").and_then(Value::as_str).unwrap_or("");
            if format != "wav" && format != "mp3" {
                return Err(ValidationError::new("audio input format must be 'wav' or 'mp3'"));
            }
            Ok(json!({"type": "input_audio", "input_audio": Value::Object(audio.clone())}))
        }
        "file" => {
            let file = obj
                .get("file")
                .and_then(Value::as_object)
                .ok_or_else(|| ValidationError::new("file content parts must include file metadata"))?;
            Ok(json!({"type": "input_file", "file": Value::Object(file.clone())}))
        }
        other => Err(ValidationError::new(format!("unsupported user content part type: {other}"))),
    }
}

/// Drop any `image_url` part whose inline base64 `data:` payload exceeds
/// the inline size cap, leaving everything else untouched.
pub fn drop_oversized_images(content: &Value) -> Value {
    match content {
        Value::Null | Value::String(_) => content.clone(),
        Value::Array(parts) => {
            let kept: Vec<Value> = parts.iter().filter(|part| !part_is_oversized_image(part)).cloned().collect();
            Value::Array(kept)
        }
        Value::Object(_) => {
            if part_is_oversized_image(content) {
                Value::Array(vec![])
            } else {
                content.clone()
            }
        }
        other => other.clone(),
    }
}

fn part_is_oversized_image(part: &Value) -> bool {
    let Some(obj) = part.as_object() else { return false };
    let part_type = obj.get("type").and_then(Value::as_str).unwrap_or("");
    if part_type != "image_url" {
        return false;
    }
    let Some(url) = obj.get("image_url").and_then(|v| v.as_object()).and_then(|m| m.get("url")).and_then(Value::as_str) else {
        return false;
    };
    is_oversized_data_url(url)
}

/// Inline data: URLs over this many bytes of decoded payload are dropped
/// rather than forwarded upstream.
pub const IMAGE_INLINE_MAX_BYTES: usize = 8 * 1024 * 1024;

pub fn is_oversized_data_url(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("data:") else { return false };
    let Some((header, data)) = rest.split_once(',') else { return false };
    if !header.contains(";base64") {
        return false;
    }
    let padding = data.bytes().filter(|b| *b == b'=').count();
    let size = (data.len() * 3) / 4;
    size.saturating_sub(padding) > IMAGE_INLINE_MAX_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_and_developer_messages_become_instructions() {
        let messages = vec![
            json!({"role": "system", "content": "be concise"}),
            json!({"role": "developer", "content": "use markdown"}),
            json!({"role": "user", "content": "hi"}),
        ];
        let (instructions, items) = coerce_messages("", &messages).unwrap();
        assert_eq!(instructions, "be concise\n\nuse markdown");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn user_text_becomes_input_text_part() {
        let messages = vec![json!({"role": "user", "content": "hello"})];
        let (_, items) = coerce_messages("", &messages).unwrap();
        assert_eq!(items[0]["content"][0]["type"], "input_text");
        assert_eq!(items[0]["content"][0]["text"], "hello");
    }

    #[test]
    fn assistant_text_becomes_output_text_part() {
        let messages = vec![json!({"role": "assistant", "content": "hello back"})];
        let (_, items) = coerce_messages("", &messages).unwrap();
        assert_eq!(items[0]["content"][0]["type"], "output_text");
    }

    #[test]
    fn image_url_part_is_converted() {
        let messages = vec![json!({
            "role": "user",
            "content": [{"type": "image_url", "image_url": {"url": "https://example.com/a.png"}}],
        })];
        let (_, items) = coerce_messages("", &messages).unwrap();
        assert_eq!(items[0]["content"][0]["type"], "input_image");
        assert_eq!(items[0]["content"][0]["image_url"], "https://example.com/a.png");
    }

    #[test]
    fn unknown_part_type_is_rejected() {
        let messages = vec![json!({"role": "user", "content": [{"type": "carrier_pigeon"}]})];
        assert!(coerce_messages("", &messages).is_err());
    }

    #[test]
    fn oversized_inline_image_is_dropped() {
        let big_data = "A".repeat(12_000_000);
        let url = format!("data:image/png;base64,{big_data}");
        assert!(is_oversized_data_url(&url));
        let content = json!([
            {"type": "text", "text": "look at this"},
            {"type": "image_url", "image_url": {"url": url}},
        ]);
        let sanitized = drop_oversized_images(&content);
        assert_eq!(sanitized.as_array().unwrap().len(), 1);
    }

    #[test]
    fn small_inline_image_is_kept() {
        let url = format!("data:image/png;base64,{}", "A".repeat(100));
        assert!(!is_oversized_data_url(&url));
    }

    #[test]
    fn non_data_url_is_never_oversized() {
        assert!(!is_oversized_data_url("https://example.com/a.png"));
    }
}
