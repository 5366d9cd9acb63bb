//! Transaction pipeline.
//!
//! # Data Flow
//! ```text
//! InboundRequest (body already captured)
//!     → context.rs   open: build REQUEST record
//!     → forwarding   one upstream call
//!     → translate    failures become synthesized results
//!     → context.rs   complete: build RESPONSE record (turnaround, code_type)
//!     → LogSink      emit REQUEST, then RESPONSE
//!     → OutboundResult back to the transport
//! ```
//!
//! # Design Decisions
//! - Callable without a server; tests drive `handle` directly
//! - Records are emitted only after a terminal outcome, so a transaction
//!   abandoned mid-flight (caller hung up) leaves no partial records
//! - No shared mutable state between transactions

pub mod clock;
pub mod context;

use std::sync::Arc;

use axum::http::StatusCode;

use crate::config::ProxyConfig;
use crate::forwarding::{translate, ForwardingEngine};
use crate::http::request::{InboundRequest, RequestId};
use crate::http::response::OutboundResult;
use crate::observability::{LogRecordBuilder, LogSink, TimestampZone};

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{CompletedTransaction, TransactionContext};

/// capture → log(request) → forward → log(response) → return.
#[derive(Clone)]
pub struct Pipeline {
    engine: ForwardingEngine,
    destination: String,
    sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    builder: LogRecordBuilder,
}

impl Pipeline {
    pub fn new(config: &ProxyConfig, sink: Arc<dyn LogSink>, clock: Arc<dyn Clock>) -> Self {
        let zone = if config.logging.utc_timestamps {
            TimestampZone::Utc
        } else {
            TimestampZone::Local
        };
        Self {
            engine: ForwardingEngine::new(
                &config.timeouts,
                &config.pool,
                clock.clone(),
                config.logging.body_limit(),
            ),
            destination: config.destination.host.clone(),
            sink,
            clock,
            builder: LogRecordBuilder::new(zone),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Run one transaction; the correlation id comes from the request headers.
    pub async fn handle(&self, request: InboundRequest) -> OutboundResult {
        let request_id = RequestId::from_headers(&request.headers);
        self.handle_with_id(request, request_id).await.1
    }

    /// Run one transaction under a caller-chosen correlation id.
    pub async fn handle_with_id(
        &self,
        request: InboundRequest,
        request_id: RequestId,
    ) -> (RequestId, OutboundResult) {
        let ctx = TransactionContext::open(request, request_id, &self.builder);

        let result = match self.engine.forward(ctx.request(), &self.destination).await {
            Ok(result) => result,
            Err(err) => {
                let translation = translate(&err);
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    method = %ctx.request().method,
                    path = %ctx.request().path,
                    status = translation.status.as_u16(),
                    error = %err,
                    "Forwarding failed"
                );
                OutboundResult::synthesized(
                    translation.status,
                    translation.body,
                    err.to_string(),
                    self.clock.now_millis(),
                )
            }
        };

        self.conclude(ctx, result)
    }

    /// Close a transaction that ended before it could be forwarded.
    ///
    /// Both records are still emitted, with the synthesized `status` and `message`.
    pub fn reject(
        &self,
        request: InboundRequest,
        request_id: RequestId,
        status: StatusCode,
        message: &str,
        error: impl Into<String>,
    ) -> (RequestId, OutboundResult) {
        let ctx = TransactionContext::open(request, request_id, &self.builder);
        let result = OutboundResult::synthesized(status, message, error, self.clock.now_millis());
        self.conclude(ctx, result)
    }

    fn conclude(&self, ctx: TransactionContext, result: OutboundResult) -> (RequestId, OutboundResult) {
        let done = ctx.complete(result, &self.builder);
        done.emit(self.sink.as_ref());
        done.into_parts()
    }
}
