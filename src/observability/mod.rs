//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest ─┐
//!                 ├─▶ builder.rs ─▶ LogRecord ─▶ sink.rs (LogSink::emit)
//! OutboundResult ─┘      │                          └─▶ tracing (logging.rs)
//!                        ├─ body.rs   (JSON map or opaque text)
//!                        └─ status.rs ("200 OK", "2XX")
//!
//! Transport handler ─▶ metrics.rs (counters, histograms)
//! ```
//!
//! # Design Decisions
//! - Records are plain ordered field maps; the sink decides the wire format
//! - Body parsing never fails a transaction, it degrades to text
//! - The correlation id flows into both records of a transaction

pub mod body;
pub mod builder;
pub mod logging;
pub mod metrics;
pub mod record;
pub mod sink;
pub mod status;

pub use builder::{LogRecordBuilder, TimestampZone};
pub use record::{LogEvent, LogRecord};
pub use sink::{LogSink, MemorySink, TracingSink};
