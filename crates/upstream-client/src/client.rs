//! POSTs the canonical payload to `{upstream_base}/responses` and exposes
//! the response as a lazy stream of parsed SSE events.

use std::pin::Pin;

use futures::Stream;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::sse;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

/// The result of a successful `POST /responses`: the upstream's response
/// headers (carrying rate-limit/quota figures alongside the SSE body) and
/// the lazy event stream itself.
pub struct UpstreamResponse {
    pub headers: HeaderMap,
    pub stream: EventStream,
}

pub struct UpstreamClient {
    http: reqwest::Client,
    upstream_base: String,
}

impl UpstreamClient {
    pub fn new(http: reqwest::Client, upstream_base: impl Into<String>) -> Self {
        Self {
            http,
            upstream_base: upstream_base.into(),
        }
    }

    /// POST `payload` to `{upstream_base}/responses` with `access_token`
    /// as a bearer credential. On a pre-stream HTTP status >= 400, reads
    /// the full body and returns [`Error::ProxyResponse`] rather than a
    /// stream — there is nothing to stream back. Otherwise the response
    /// body is exposed as a lazy, finite [`EventStream`] of parsed SSE
    /// events; the caller (the proxy orchestrator) decides how much of it
    /// to consume.
    pub async fn post_responses(&self, payload: &Value, access_token: &str, request_id: Option<&str>) -> Result<UpstreamResponse> {
        let url = format!("{}/responses", self.upstream_base.trim_end_matches('/'));

        let mut request = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header("accept", "text/event-stream")
            .json(payload);
        if let Some(id) = request_id {
            request = request.header("x-request-id", id);
        }

        let response = request.send().await.map_err(|e| Error::Http(e.to_string()))?;
        let status = response.status();

        if status.as_u16() >= 400 {
            let body = response.bytes().await.map_err(|e| Error::Http(e.to_string()))?;
            return Err(Error::ProxyResponse {
                status: status.as_u16(),
                body,
            });
        }

        let headers = response.headers().clone();
        let byte_stream = response.bytes_stream();
        Ok(UpstreamResponse {
            headers,
            stream: Box::pin(sse::event_stream(byte_stream)),
        })
    }
}
