//! Permissive extraction of account metadata from an OAuth `id_token`.
//!
//! The id token is a JWT; this module only ever reads its payload segment
//! as opaque JSON, never verifies the signature (the access token itself,
//! not the id token, is what authorizes upstream calls — the id token is
//! purely a source of display metadata).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

/// Metadata opportunistically recovered from an id token's claims.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdTokenClaims {
    pub account_id: Option<String>,
    pub plan_type: Option<String>,
    pub email: Option<String>,
}

/// Decode and extract claims, checking a nested `auth` object first and
/// falling back to top-level fields for each key independently.
///
/// Returns `IdTokenClaims::default()` on any decode failure — a malformed
/// id token is not itself a refresh failure, it just means no metadata was
/// learned this cycle.
pub fn extract_id_token_claims(id_token: &str) -> IdTokenClaims {
    let Some(payload) = decode_jwt_payload(id_token) else {
        return IdTokenClaims::default();
    };

    let auth = payload.get("auth").and_then(Value::as_object);

    IdTokenClaims {
        account_id: claim_str(&payload, auth, "chatgpt_account_id")
            .or_else(|| claim_str(&payload, auth, "account_id")),
        plan_type: claim_str(&payload, auth, "chatgpt_plan_type")
            .or_else(|| claim_str(&payload, auth, "plan_type")),
        email: claim_str(&payload, auth, "email"),
    }
}

fn claim_str(
    top: &serde_json::Map<String, Value>,
    auth: Option<&serde_json::Map<String, Value>>,
    key: &str,
) -> Option<String> {
    auth.and_then(|a| a.get(key))
        .or_else(|| top.get(key))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn decode_jwt_payload(token: &str) -> Option<serde_json::Map<String, Value>> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let payload_b64 = parts.next()?;
    let bytes = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    let value: Value = serde_json::from_slice(&bytes).ok()?;
    value.as_object().cloned()
}
