//! Upstream call construction and execution.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;

use crate::config::{PoolConfig, TimeoutConfig};
use crate::forwarding::client::UpstreamClient;
use crate::forwarding::error::ForwardError;
use crate::forwarding::method::parse_method;
use crate::forwarding::uri::build_destination_uri;
use crate::http::capture::CapturedBody;
use crate::http::headers::Headers;
use crate::http::request::InboundRequest;
use crate::http::response::OutboundResult;
use crate::pipeline::clock::Clock;

/// Relays one captured request to the destination.
#[derive(Clone)]
pub struct ForwardingEngine {
    client: UpstreamClient,
    clock: Arc<dyn Clock>,
    log_limit: Option<usize>,
}

impl ForwardingEngine {
    pub fn new(
        timeouts: &TimeoutConfig,
        pool: &PoolConfig,
        clock: Arc<dyn Clock>,
        log_limit: Option<usize>,
    ) -> Self {
        Self {
            client: UpstreamClient::new(timeouts, pool),
            clock,
            log_limit,
        }
    }

    /// Issue exactly one upstream call for `request`.
    ///
    /// The destination URI is built before anything else, so an unusable
    /// destination never reaches the network. Upstream 4xx/5xx replies come
    /// back as `Ok`.
    pub async fn forward(
        &self,
        request: &InboundRequest,
        dest_host: &str,
    ) -> Result<OutboundResult, ForwardError> {
        let uri = build_destination_uri(dest_host, &request.path, request.query.as_deref())?;
        let method = parse_method(&request.method)?;
        let headers = request
            .headers
            .to_header_map()
            .map_err(|e| ForwardError::Internal(e.to_string()))?;

        let mut upstream_request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(request.body.forwardable().clone()))
            .map_err(|e| ForwardError::Internal(e.to_string()))?;
        *upstream_request.headers_mut() = headers;

        tracing::debug!(
            method = %upstream_request.method(),
            uri = %upstream_request.uri(),
            body_bytes = request.body.len(),
            "Forwarding request upstream"
        );

        let response = self.client.execute(upstream_request).await?;
        let completed_at = self.clock.now_millis();

        let (parts, body) = response.into_parts();
        Ok(OutboundResult::upstream(
            parts.status.as_u16(),
            Headers::from_header_map(&parts.headers),
            CapturedBody::new(body, self.log_limit),
            completed_at,
        ))
    }
}
