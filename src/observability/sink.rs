//! Log sinks: where finished records go.
//!
//! The pipeline only produces field maps; formatting and transport belong
//! to the sink. One sink handle is built at startup and injected.

use std::sync::Mutex;

use serde_json::Value;

use crate::observability::record::{LogEvent, LogRecord};

/// `tracing` target for transaction records.
pub const HTTP_TARGET: &str = "http";

/// Structured-logging collaborator accepting finished records.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent, record: &LogRecord);
}

/// Emits each record as one INFO event on the `http` target.
///
/// Scalar fields become event fields of their own; the complete record,
/// nested headers and body included, travels as JSON in `record`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, event: LogEvent, record: &LogRecord) {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(target: HTTP_TARGET, event = event.as_str(), error = %e, "Failed to serialize record");
                return;
            }
        };
        tracing::info!(
            target: HTTP_TARGET,
            event = event.as_str(),
            request_id = record.get_str("request_id"),
            method = record.get_str("method"),
            path = record.get_str("path"),
            url = record.get_str("url"),
            timestamp = record.get_str("timestamp"),
            status_code = record.get_str("status_code"),
            code_type = record.get_str("code_type"),
            turnaround_time = record.get("turnaround_time").and_then(serde_json::Value::as_i64),
            error = record.get_str("error"),
            record = %json,
            "{}",
            event
        );
    }
}

/// Keeps records in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(LogEvent, LogRecord)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn records(&self) -> Vec<(LogEvent, LogRecord)> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Drain everything emitted so far.
    pub fn take(&self) -> Vec<(LogEvent, LogRecord)> {
        self.records
            .lock()
            .map(|mut r| std::mem::take(&mut *r))
            .unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: LogEvent, record: &LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push((event, record.clone()));
        }
    }
}
