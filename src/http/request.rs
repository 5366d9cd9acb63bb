//! Inbound request model.
//!
//! # Responsibilities
//! - Snapshot everything the pipeline needs from one inbound request
//! - Derive the correlation id (inbound `x-request-id` or UUID v4)
//! - Derive log-facing views: request URL, decoded query parameters
//!
//! # Design Decisions
//! - The snapshot is immutable once built; the body is already captured
//! - Remote host is the peer IP; no reverse DNS on the request path

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::http::request::Parts;
use axum::http::Version;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::http::capture::CapturedBody;
use crate::http::headers::Headers;

/// Header carrying the correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation identifier shared by a transaction's REQUEST and RESPONSE records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Fresh UUID v4 id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reuse the caller's `x-request-id` when it is present and non-blank.
    pub fn from_headers(headers: &Headers) -> Self {
        headers
            .get_ignore_case(X_REQUEST_ID)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One inbound request, captured.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Headers,
    pub body: CapturedBody,
    pub remote_addr: SocketAddr,
    pub protocol: String,
    /// Epoch millis, taken on arrival.
    pub received_at: i64,
}

impl InboundRequest {
    /// Minimal request for `method path`; everything else defaulted.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: None,
            headers: Headers::new(),
            body: CapturedBody::empty(),
            remote_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            protocol: protocol_string(Version::HTTP_11),
            received_at: 0,
        }
    }

    /// Build from transport parts and an already captured body.
    pub fn from_parts(
        parts: &Parts,
        body: CapturedBody,
        remote_addr: SocketAddr,
        received_at: i64,
    ) -> Self {
        Self {
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: Headers::from_header_map(&parts.headers),
            body,
            remote_addr,
            protocol: protocol_string(parts.version),
            received_at,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: CapturedBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = addr;
        self
    }

    pub fn with_received_at(mut self, millis: i64) -> Self {
        self.received_at = millis;
        self
    }

    /// `http://<host><path>`, host from the Host header or `localhost`.
    pub fn request_url(&self) -> String {
        let host = self
            .headers
            .get_ignore_case("host")
            .filter(|h| !h.is_empty())
            .unwrap_or("localhost");
        format!("http://{}{}", host, self.path)
    }

    /// Query parameters, percent-decoded. The first value of a repeated key wins.
    pub fn parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        if let Some(query) = self.query.as_deref() {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params
                    .entry(key.into_owned())
                    .or_insert_with(|| Value::String(value.into_owned()));
            }
        }
        params
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get_ignore_case("content-type")
    }
}

fn protocol_string(version: Version) -> String {
    format!("{:?}", version)
}
