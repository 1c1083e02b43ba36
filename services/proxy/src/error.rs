//! The orchestrator/router error boundary.
//!
//! Every other crate in the workspace returns a typed `Result`; this is
//! the one place errors are rendered to the wire, in one of the two
//! shapes the spec's external interface names: the upstream-facing
//! `{error:{code,message,type}}` used by `/v1/*` and `/backend-api/*`, and
//! the narrower dashboard `{error:{code,message}}` used by `/api/*`. The
//! same type renders either shape depending on whether `error_type` is
//! set — callers on the `/api/*` surface simply never set it.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub error_type: Option<&'static str>,
}

impl AppError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>, error_type: Option<&'static str>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            error_type,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request_error", message, Some("invalid_request_error"))
    }

    pub fn ip_forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "ip_forbidden", "client IP is not in the allowlist", Some("access_error"))
    }

    pub fn no_accounts(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "no_accounts", message, Some("server_error"))
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "upstream_error", message, Some("upstream_error"))
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED, "not_implemented", message, Some("server_error"))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message, Some("server_error"))
    }

    /// Drop the `type` field, rendering the narrower dashboard envelope
    /// used by the `/api/*` surface.
    pub fn as_dashboard(mut self) -> Self {
        self.error_type = None;
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match self.error_type {
            Some(error_type) => json!({"error": {"code": self.code, "message": self.message, "type": error_type}}),
            None => json!({"error": {"code": self.code, "message": self.message}}),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<translator::ValidationError> for AppError {
    fn from(err: translator::ValidationError) -> Self {
        AppError::invalid_request(err.message)
    }
}

impl From<store::Error> for AppError {
    fn from(err: store::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<firewall::Error> for AppError {
    fn from(err: firewall::Error) -> Self {
        match err {
            firewall::Error::Forbidden(_) => AppError::ip_forbidden(),
            firewall::Error::Store(e) => AppError::from(e),
        }
    }
}

impl From<balancer::Error> for AppError {
    fn from(err: balancer::Error) -> Self {
        match err {
            balancer::Error::NoAccounts(msg) => AppError::no_accounts(msg),
            balancer::Error::Store(e) => AppError::from(e),
        }
    }
}
