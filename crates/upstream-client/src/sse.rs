//! SSE framing, byte-identical to the original's `format_sse_event`, plus
//! a streaming event parser for reading frames back off an upstream
//! response body.

use bytes::Bytes;
use futures::Stream;
use serde_json::Value;

use crate::error::{Error, Result};

/// Render one SSE frame for `payload`. When `payload.type` is a non-empty
/// string, an `event: <type>` line precedes the `data:` line; otherwise
/// only `data:` is emitted. JSON is serialized with ASCII-safe escaping
/// (non-ASCII characters `\u`-escaped) and compact separators, matching
/// the original byte-for-byte so strict SSE clients aren't affected.
pub fn format_sse_event(payload: &Value) -> String {
    let data = to_ascii_compact_json(payload);
    match payload.get("type").and_then(Value::as_str) {
        Some(event_type) if !event_type.is_empty() => format!("event: {event_type}\ndata: {data}\n\n"),
        _ => format!("data: {data}\n\n"),
    }
}

fn to_ascii_compact_json(value: &Value) -> String {
    let compact = serde_json::to_string(value).expect("Value always serializes");
    escape_non_ascii(&compact)
}

fn escape_non_ascii(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            let mut buf = [0u16; 2];
            for unit in ch.encode_utf16(&mut buf) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

/// Read SSE frames off a chunked byte stream, yielding each frame's
/// `data:` payload parsed as JSON. Frames are delimited by a blank line;
/// multiple `data:` lines within one frame are joined with `\n` before
/// parsing, per the SSE spec.
pub fn event_stream<S>(mut bytes: S) -> impl Stream<Item = Result<Value>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin,
{
    async_stream::stream! {
        use futures::StreamExt;

        let mut buffer = String::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| Error::Http(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find("\n\n") {
                let frame = buffer[..pos].to_string();
                buffer.drain(..pos + 2);
                if let Some(event) = parse_frame(&frame)? {
                    yield Ok(event);
                }
            }
        }
        if !buffer.trim().is_empty() {
            if let Some(event) = parse_frame(&buffer)? {
                yield Ok(event);
            }
        }
    }
}

fn parse_frame(frame: &str) -> Result<Option<Value>> {
    let mut data_lines = Vec::new();
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        return Ok(None);
    }
    let joined = data_lines.join("\n");
    let value = serde_json::from_str(&joined).map_err(|e| Error::MalformedEvent(format!("{e}: {joined}")))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_with_string_type_gets_event_line() {
        let payload = json!({"type": "response.completed", "response": {"id": "r1"}});
        let frame = format_sse_event(&payload);
        assert!(frame.starts_with("event: response.completed\ndata: "));
        assert!(frame.ends_with("\n\n"));
    }

    #[test]
    fn event_without_type_omits_event_line() {
        let payload = json!({"delta": "hi"});
        let frame = format_sse_event(&payload);
        assert!(frame.starts_with("data: "));
        assert!(!frame.contains("event:"));
    }

    #[test]
    fn empty_string_type_omits_event_line() {
        let payload = json!({"type": ""});
        let frame = format_sse_event(&payload);
        assert!(!frame.contains("event:"));
    }

    #[test]
    fn non_ascii_characters_are_escaped() {
        let payload = json!({"type": "message", "text": "héllo"});
        let frame = format_sse_event(&payload);
        assert!(frame.contains("\\u00e9"));
        assert!(!frame.contains('é'));
    }

    #[test]
    fn separators_are_compact() {
        let payload = json!({"a": 1, "b": 2});
        let frame = format_sse_event(&payload);
        assert!(frame.contains("{\"a\":1,\"b\":2}"));
    }

    #[test]
    fn parse_frame_joins_multiple_data_lines() {
        let frame = "data: {\"a\"\ndata: :1}";
        let value = parse_frame(frame).unwrap().unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn parse_frame_without_data_line_is_none() {
        assert_eq!(parse_frame("event: ping").unwrap(), None);
    }
}
