//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → uri.rs (destination + path[?query], validated)
//!     → method.rs (case-sensitive verb mapping)
//!     → engine.rs (headers + body copied verbatim)
//!     → client.rs (pooled hyper client, timeouts, one attempt)
//!     → OutboundResult (any upstream status)
//!
//! On failure:
//!     error.rs (ForwardError, TransportErrorKind)
//!     → translate.rs (404 / 400 / 502 / 504 / 500)
//! ```

pub mod client;
pub mod engine;
pub mod error;
pub mod method;
pub mod translate;
pub mod uri;

pub use engine::ForwardingEngine;
pub use error::{ForwardError, TransportErrorKind};
pub use translate::{translate, Translation};
