//! Builds the REQUEST and RESPONSE records of a transaction.
//!
//! # Fields
//! REQUEST: `request_id`, `method`, `path`, `headers`, `parameters`,
//! `timestamp`, `body`, `protocol`, `url`, `remote_ip`, `remote_host`,
//! `remote_port`.
//!
//! RESPONSE: `request_id`, `status_code`, `path`, `headers`, `timestamp`,
//! `turnaround_time`, `body`, `url`, `code_type`, plus `error` when the
//! result was synthesized from a failure.

use chrono::{Local, TimeZone, Utc};
use serde_json::Value;

use crate::http::request::{InboundRequest, RequestId};
use crate::http::response::OutboundResult;
use crate::observability::body::body_field;
use crate::observability::record::LogRecord;
use crate::observability::status::{code_type, status_line};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Clock used to render record timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampZone {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone, Default)]
pub struct LogRecordBuilder {
    zone: TimestampZone,
}

impl LogRecordBuilder {
    pub fn new(zone: TimestampZone) -> Self {
        Self { zone }
    }

    pub fn request_record(&self, request: &InboundRequest, request_id: &RequestId) -> LogRecord {
        let mut record = LogRecord::new();
        record.insert("request_id", request_id.as_str());
        record.insert("method", request.method.as_str());
        record.insert("path", request.path.as_str());
        record.insert("headers", request.headers.to_json());
        record.insert("parameters", Value::Object(request.parameters()));
        record.insert("timestamp", self.format_timestamp(request.received_at));
        record.insert("body", body_field(&request.body, request.content_type()));
        record.insert("protocol", request.protocol.as_str());
        record.insert("url", request.request_url());
        record.insert("remote_ip", request.remote_addr.ip().to_string());
        record.insert("remote_host", request.remote_addr.ip().to_string());
        record.insert("remote_port", request.remote_addr.port());
        record
    }

    pub fn response_record(
        &self,
        result: &OutboundResult,
        request: &InboundRequest,
        request_id: &RequestId,
        request_timestamp: i64,
    ) -> LogRecord {
        let mut record = LogRecord::new();
        record.insert("request_id", request_id.as_str());
        record.insert("status_code", status_line(result.status));
        record.insert("path", request.path.as_str());
        record.insert("headers", result.headers.to_json());
        record.insert("timestamp", self.format_timestamp(result.completed_at));
        record.insert("turnaround_time", result.completed_at - request_timestamp);
        record.insert("body", body_field(&result.body, result.content_type()));
        record.insert("url", request.request_url());
        record.insert("code_type", code_type(result.status));
        if let Some(error) = &result.error {
            record.insert("error", error.as_str());
        }
        record
    }

    /// `YYYY-MM-DD HH:MM:SS.mmm`; the raw millis if out of chrono's range.
    pub fn format_timestamp(&self, millis: i64) -> String {
        let formatted = match self.zone {
            TimestampZone::Local => Local
                .timestamp_millis_opt(millis)
                .single()
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            TimestampZone::Utc => Utc
                .timestamp_millis_opt(millis)
                .single()
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
        };
        formatted.unwrap_or_else(|| millis.to_string())
    }
}
