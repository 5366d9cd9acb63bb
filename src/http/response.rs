//! Outbound result and replay to the original caller.
//!
//! # Responsibilities
//! - Hold what the upstream answered (or what was synthesized on failure)
//! - Replay status and body bytes to the caller
//! - Strip hop-by-hop headers on the way back
//!
//! # Design Decisions
//! - Upstream 4xx/5xx are ordinary results, never errors
//! - `content-length` is left to the transport so it always matches the body

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

use crate::http::capture::CapturedBody;
use crate::http::headers::Headers;
use crate::http::request::{RequestId, X_REQUEST_ID};

/// Headers that describe a single connection and must not be replayed.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "content-length",
];

/// Result of one forwarding attempt.
#[derive(Debug, Clone)]
pub struct OutboundResult {
    pub status: u16,
    pub headers: Headers,
    pub body: CapturedBody,
    /// Epoch millis, taken right after the upstream call (or error handling) finished.
    pub completed_at: i64,
    /// Failure description when the result was synthesized.
    pub error: Option<String>,
}

impl OutboundResult {
    /// Result populated from an upstream reply.
    pub fn upstream(status: u16, headers: Headers, body: CapturedBody, completed_at: i64) -> Self {
        Self {
            status,
            headers,
            body,
            completed_at,
            error: None,
        }
    }

    /// Result synthesized from a failure.
    pub fn synthesized(
        status: StatusCode,
        message: &str,
        error: impl Into<String>,
        completed_at: i64,
    ) -> Self {
        let mut headers = Headers::new();
        headers.append("content-type", "text/plain; charset=utf-8");
        Self {
            status: status.as_u16(),
            headers,
            body: CapturedBody::new(message.to_string(), None),
            completed_at,
            error: Some(error.into()),
        }
    }

    pub fn is_synthesized(&self) -> bool {
        self.error.is_some()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get_ignore_case("content-type")
    }

    /// Render for the caller, tagging it with the correlation id.
    pub fn into_client_response(self, request_id: &RequestId) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut response = Response::new(Body::from(self.body.forwardable().clone()));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, values) in self.headers.iter() {
            if HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name)) {
                continue;
            }
            let Ok(header_name) = axum::http::HeaderName::from_bytes(name.as_bytes()) else {
                tracing::debug!(header = %name, "Dropping unrepresentable response header");
                continue;
            };
            for value in values {
                if let Ok(header_value) = HeaderValue::from_maybe_shared(value.clone()) {
                    headers.append(header_name.clone(), header_value);
                }
            }
        }
        if let Ok(id) = HeaderValue::from_str(request_id.as_str()) {
            headers.insert(X_REQUEST_ID, id);
        }
        response
    }
}
