//! Failure → caller-visible status and body.
//!
//! | Failure                                   | Status |
//! |-------------------------------------------|--------|
//! | invalid destination URI                   | 404    |
//! | unsupported method                        | 400    |
//! | read timeout                              | 504    |
//! | connect timeout / refused / other         | 502    |
//! | internal                                  | 500    |
//!
//! Inbound bodies that cannot be captured never reach forwarding; the
//! server answers them with `PAYLOAD_TOO_LARGE` (413) or `BAD_REQUEST` (400).
//!
//! Timeouts are split from other connectivity failures: a slow upstream
//! and an unreachable upstream are different operational signals.

use axum::http::StatusCode;

use crate::forwarding::error::{ForwardError, TransportErrorKind};

pub const INADEQUATE_URI: &str = "Inadequate URI";
pub const UNSUPPORTED_METHOD: &str = "Unsupported Method";
pub const GATEWAY_TIMEOUT: &str = "Gateway Timeout";
pub const BAD_GATEWAY: &str = "Bad Gateway";
pub const INTERNAL_ERROR: &str = "Internal Server Error";
pub const PAYLOAD_TOO_LARGE: &str = "Payload Too Large";
pub const BAD_REQUEST: &str = "Bad Request";

/// Status and body text shown to the caller for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub status: StatusCode,
    pub body: &'static str,
}

pub fn translate(err: &ForwardError) -> Translation {
    let (status, body) = match err {
        ForwardError::InvalidDestination { .. } => (StatusCode::NOT_FOUND, INADEQUATE_URI),
        ForwardError::UnsupportedMethod(_) => (StatusCode::BAD_REQUEST, UNSUPPORTED_METHOD),
        ForwardError::Transport { kind, .. } => match kind {
            TransportErrorKind::ReadTimeout => (StatusCode::GATEWAY_TIMEOUT, GATEWAY_TIMEOUT),
            TransportErrorKind::ConnectTimeout
            | TransportErrorKind::ConnectionRefused
            | TransportErrorKind::Other => (StatusCode::BAD_GATEWAY, BAD_GATEWAY),
        },
        ForwardError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR),
    };
    Translation { status, body }
}
