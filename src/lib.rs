//! Capture proxy library.
//!
//! Relays every inbound request to one configured upstream, records the
//! request and the response as structured log records, and replays the
//! upstream answer to the caller.

pub mod config;
pub mod forwarding;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::Pipeline;
