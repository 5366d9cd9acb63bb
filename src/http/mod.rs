//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, any method / any path)
//!     → capture.rs (drain body once, keep a loggable view)
//!     → request.rs (InboundRequest snapshot, correlation id)
//!     → [pipeline forwards and logs]
//!     → response.rs (replay status, headers, body)
//!     → Send to client
//! ```

pub mod capture;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use capture::{CaptureError, CapturedBody};
pub use headers::Headers;
pub use request::{InboundRequest, RequestId, X_REQUEST_ID};
pub use response::OutboundResult;
pub use server::HttpServer;
