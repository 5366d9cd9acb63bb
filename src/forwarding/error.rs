//! Forwarding failure taxonomy.
//!
//! Upstream HTTP error statuses are not represented here: a 4xx/5xx reply
//! is a normal result and is relayed unchanged.

use std::fmt;

/// Transport-level failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// TCP connect, or waiting for a pooled connection, took too long.
    ConnectTimeout,
    /// Upstream accepted the request but did not answer in time.
    ReadTimeout,
    /// Upstream actively refused the connection.
    ConnectionRefused,
    /// DNS failure, reset, protocol error, ...
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::ConnectTimeout => "connect timeout",
            TransportErrorKind::ReadTimeout => "read timeout",
            TransportErrorKind::ConnectionRefused => "connection refused",
            TransportErrorKind::Other => "transport failure",
        };
        f.write_str(s)
    }
}

/// Errors raised while building or executing the upstream call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    /// `destination + path[?query]` is not a usable absolute URI.
    #[error("invalid destination URI `{uri}`: {reason}")]
    InvalidDestination { uri: String, reason: String },

    /// Method outside the recognized verb set.
    #[error("unsupported method `{0}`")]
    UnsupportedMethod(String),

    #[error("upstream {kind}: {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// Anything the proxy itself got wrong.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ForwardError {
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            ForwardError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Classify a client failure by walking its source chain for an I/O cause.
///
/// `connect` is true when the failure happened while establishing the
/// connection.
pub fn classify(err: &(dyn std::error::Error + 'static), connect: bool) -> TransportErrorKind {
    let io_kind = io_error_kind(err);
    match (connect, io_kind) {
        (true, Some(std::io::ErrorKind::TimedOut)) => TransportErrorKind::ConnectTimeout,
        (true, Some(std::io::ErrorKind::ConnectionRefused)) => TransportErrorKind::ConnectionRefused,
        (false, Some(std::io::ErrorKind::TimedOut)) => TransportErrorKind::ReadTimeout,
        _ => TransportErrorKind::Other,
    }
}

fn io_error_kind(err: &(dyn std::error::Error + 'static)) -> Option<std::io::ErrorKind> {
    let mut source = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = e.source();
    }
    None
}
