//! OAuth refresh-grant client.
//!
//! The only token-endpoint interaction this proxy performs itself is the
//! refresh grant — authorization-code exchange and device-code enrollment
//! belong to the dashboard's OAuth collaborator and are out of scope here.

use common::is_permanent_code;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claims::{IdTokenClaims, extract_id_token_claims};
use crate::error::{Error, Result};

/// Tokens and opportunistically-learned metadata returned by a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: Option<String>,
    pub account_id: Option<String>,
    pub plan_type: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshRequestBody<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    refresh_token: &'a str,
    scope: &'a str,
}

/// Permissive response shape: only fields we act on are named; everything
/// else is ignored rather than rejected.
#[derive(Debug, Deserialize, Default)]
struct RefreshResponseBody {
    access_token: Option<String>,
    refresh_token: Option<String>,
    id_token: Option<String>,
}

/// Issue a `grant_type=refresh_token` request to `{auth_base_url}/oauth/token`.
///
/// `request_id`, when present, is propagated as `x-request-id` so upstream
/// logs can be correlated with the request that triggered the refresh.
pub async fn refresh_token(
    client: &reqwest::Client,
    auth_base_url: &str,
    client_id: &str,
    refresh_token: &str,
    scope: &str,
    timeout: std::time::Duration,
    request_id: Option<&str>,
) -> Result<RefreshedTokens> {
    let url = format!("{}/oauth/token", auth_base_url.trim_end_matches('/'));
    let body = RefreshRequestBody {
        grant_type: "refresh_token",
        client_id,
        refresh_token,
        scope,
    };

    let mut request = client.post(&url).timeout(timeout).json(&body);
    if let Some(id) = request_id {
        request = request.header("x-request-id", id);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::Http(format!("refresh request failed: {e}")))?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Http(format!("failed to read refresh response body: {e}")))?;

    if !status.is_success() {
        let (code, message) = refresh_error_from_payload(&bytes, status.as_u16());
        let is_permanent = is_permanent_code(&code);
        return Err(Error::Rejected {
            code,
            message,
            is_permanent,
        });
    }

    let parsed: RefreshResponseBody = serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidResponse(format!("unparsable refresh response: {e}")))?;

    let access_token = parsed
        .access_token
        .ok_or_else(|| Error::InvalidResponse("missing access_token".into()))?;
    let refresh_token = parsed
        .refresh_token
        .ok_or_else(|| Error::InvalidResponse("missing refresh_token".into()))?;

    let IdTokenClaims {
        account_id,
        plan_type,
        email,
    } = parsed
        .id_token
        .as_deref()
        .map(extract_id_token_claims)
        .unwrap_or_default();

    Ok(RefreshedTokens {
        access_token,
        refresh_token,
        id_token: parsed.id_token,
        account_id,
        plan_type,
        email,
    })
}

/// Extract `(code, message)` from a non-2xx refresh response body, covering
/// the shapes the identity provider is known to use: a `{"error": {...}}`
/// object, a bare string `error`, or top-level `error_code`/`code`/`message`
/// fields. Defaults `code` to `http_<status>` when nothing more specific is
/// present.
fn refresh_error_from_payload(body: &[u8], status: u16) -> (String, String) {
    let default_code = format!("http_{status}");
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return (default_code, String::from_utf8_lossy(body).into_owned());
    };

    match value {
        Value::Object(ref map) => {
            if let Some(Value::Object(err)) = map.get("error") {
                let code = err
                    .get("code")
                    .or_else(|| err.get("error_code"))
                    .and_then(Value::as_str)
                    .unwrap_or(&default_code)
                    .to_owned();
                let message = err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("refresh rejected")
                    .to_owned();
                return (code, message);
            }
            if let Some(Value::String(err)) = map.get("error") {
                let message = map
                    .get("error_description")
                    .and_then(Value::as_str)
                    .unwrap_or(err)
                    .to_owned();
                return (err.clone(), message);
            }
            let code = map
                .get("error_code")
                .or_else(|| map.get("code"))
                .and_then(Value::as_str)
                .unwrap_or(&default_code)
                .to_owned();
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("refresh rejected")
                .to_owned();
            (code, message)
        }
        _ => (default_code, "refresh rejected".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_error_shape_extracts_code_and_message() {
        let body = br#"{"error":{"code":"refresh_token_expired","message":"token expired"}}"#;
        let (code, message) = refresh_error_from_payload(body, 400);
        assert_eq!(code, "refresh_token_expired");
        assert_eq!(message, "token expired");
    }

    #[test]
    fn string_error_shape_extracts_code() {
        let body = br#"{"error":"invalid_grant"}"#;
        let (code, message) = refresh_error_from_payload(body, 400);
        assert_eq!(code, "invalid_grant");
        assert_eq!(message, "invalid_grant");
    }

    #[test]
    fn top_level_code_field_is_used() {
        let body = br#"{"code":"account_deactivated","message":"disabled"}"#;
        let (code, message) = refresh_error_from_payload(body, 403);
        assert_eq!(code, "account_deactivated");
        assert_eq!(message, "disabled");
    }

    #[test]
    fn unparsable_body_defaults_to_http_status_code() {
        let (code, _) = refresh_error_from_payload(b"not json", 500);
        assert_eq!(code, "http_500");
    }

    #[test]
    fn empty_object_defaults_to_http_status_code() {
        let (code, message) = refresh_error_from_payload(b"{}", 502);
        assert_eq!(code, "http_502");
        assert_eq!(message, "refresh rejected");
    }
}
