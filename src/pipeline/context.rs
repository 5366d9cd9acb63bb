//! Per-transaction state.
//!
//! `TransactionContext` is opened on arrival and consumed by `complete`,
//! so the result and response timestamp can be set exactly once.

use crate::http::request::{InboundRequest, RequestId};
use crate::http::response::OutboundResult;
use crate::observability::{LogEvent, LogRecord, LogRecordBuilder, LogSink};

/// An in-flight transaction.
#[derive(Debug)]
pub struct TransactionContext {
    request_id: RequestId,
    request: InboundRequest,
    request_record: LogRecord,
}

impl TransactionContext {
    /// Open a transaction; the REQUEST record is built now, emitted later.
    pub fn open(request: InboundRequest, request_id: RequestId, builder: &LogRecordBuilder) -> Self {
        let request_record = builder.request_record(&request, &request_id);
        Self {
            request_id,
            request,
            request_record,
        }
    }

    pub fn request(&self) -> &InboundRequest {
        &self.request
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn request_timestamp(&self) -> i64 {
        self.request.received_at
    }

    /// Attach the terminal result.
    ///
    /// A completion timestamp earlier than arrival (wall clock stepped back)
    /// is clamped so the turnaround time is never negative.
    pub fn complete(self, mut result: OutboundResult, builder: &LogRecordBuilder) -> CompletedTransaction {
        result.completed_at = result.completed_at.max(self.request.received_at);
        let response_record = builder.response_record(
            &result,
            &self.request,
            &self.request_id,
            self.request.received_at,
        );
        CompletedTransaction {
            request_id: self.request_id,
            request_record: self.request_record,
            response_record,
            result,
        }
    }
}

/// A transaction that reached its terminal outcome.
#[derive(Debug)]
pub struct CompletedTransaction {
    request_id: RequestId,
    request_record: LogRecord,
    response_record: LogRecord,
    result: OutboundResult,
}

impl CompletedTransaction {
    /// Emit REQUEST then RESPONSE.
    pub fn emit(&self, sink: &dyn LogSink) {
        sink.emit(LogEvent::Request, &self.request_record);
        sink.emit(LogEvent::Response, &self.response_record);
    }

    pub fn result(&self) -> &OutboundResult {
        &self.result
    }

    pub fn into_parts(self) -> (RequestId, OutboundResult) {
        (self.request_id, self.result)
    }
}
