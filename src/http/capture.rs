//! Body capture.
//!
//! # Responsibilities
//! - Drain a body stream into memory exactly once
//! - Hand out the full bytes for forwarding/replay
//! - Hand out a (possibly truncated) view of the same bytes for logging
//!
//! # Design Decisions
//! - Both views share one `Bytes` buffer; nothing is copied or mutated
//! - The logging cap never affects what is forwarded
//! - Text decoding is lossy so odd charsets degrade to opaque text

use std::borrow::Cow;

use axum::body::{Body, Bytes};
use http_body_util::LengthLimitError;

/// Errors while draining an inbound body.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The body exceeded the configured ceiling.
    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// The stream failed before it was fully read.
    #[error("failed to read body: {0}")]
    Read(String),
}

/// A fully read message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedBody {
    forwardable: Bytes,
    loggable: Bytes,
}

impl CapturedBody {
    /// Wrap already-buffered bytes. `log_limit` caps the loggable view only.
    pub fn new(bytes: impl Into<Bytes>, log_limit: Option<usize>) -> Self {
        let forwardable = bytes.into();
        let loggable = match log_limit {
            Some(limit) if forwardable.len() > limit => forwardable.slice(..limit),
            _ => forwardable.clone(),
        };
        Self {
            forwardable,
            loggable,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Drain `body` completely. The stream must not be used afterwards.
    pub async fn capture(
        body: Body,
        max_bytes: usize,
        log_limit: Option<usize>,
    ) -> Result<Self, CaptureError> {
        let bytes = axum::body::to_bytes(body, max_bytes)
            .await
            .map_err(|e| classify_read_error(e, max_bytes))?;
        Ok(Self::new(bytes, log_limit))
    }

    /// Full body, exactly as received.
    pub fn forwardable(&self) -> &Bytes {
        &self.forwardable
    }

    /// Logging view; identical on every call.
    pub fn loggable(&self) -> &[u8] {
        &self.loggable
    }

    /// Logging view decoded as UTF-8, replacing invalid sequences.
    pub fn loggable_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.loggable)
    }

    pub fn is_truncated(&self) -> bool {
        self.loggable.len() < self.forwardable.len()
    }

    pub fn len(&self) -> usize {
        self.forwardable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forwardable.is_empty()
    }
}

fn classify_read_error(err: axum::Error, limit: usize) -> CaptureError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return CaptureError::TooLarge { limit };
        }
        source = e.source();
    }
    CaptureError::Read(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loggable_view_is_repeatable() {
        let body = CapturedBody::new(Bytes::from_static(b"{\"a\":1}"), None);
        assert_eq!(body.loggable(), body.loggable());
        assert_eq!(body.loggable(), b"{\"a\":1}");
        assert_eq!(body.forwardable().as_ref(), b"{\"a\":1}");
        assert!(!body.is_truncated());
    }

    #[test]
    fn cap_truncates_only_the_log_view() {
        let body = CapturedBody::new(Bytes::from_static(b"0123456789"), Some(4));
        assert_eq!(body.loggable(), b"0123");
        assert_eq!(body.forwardable().as_ref(), b"0123456789");
        assert!(body.is_truncated());
        assert_eq!(body.len(), 10);
    }

    #[test]
    fn invalid_utf8_degrades_to_text() {
        let body = CapturedBody::new(vec![b'o', b'k', 0xff], None);
        assert_eq!(body.loggable_text(), "ok\u{fffd}");
        assert_eq!(body.forwardable().as_ref(), &[b'o', b'k', 0xff]);
    }

    #[tokio::test]
    async fn capture_drains_stream() {
        let body = CapturedBody::capture(Body::from("hello"), 1024, None)
            .await
            .unwrap();
        assert_eq!(body.forwardable().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn capture_rejects_oversized_body() {
        let err = CapturedBody::capture(Body::from("hello world"), 4, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::TooLarge { limit: 4 }));
    }

    #[test]
    fn other_stream_failures_are_read_errors() {
        let err = axum::Error::new(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "length limit exceeded",
        ));
        assert!(matches!(classify_read_error(err, 4), CaptureError::Read(_)));
    }
}
