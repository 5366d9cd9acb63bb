//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router that accepts any method on any path
//! - Wire up middleware (tracing, panic catching)
//! - Capture the inbound body and snapshot the request
//! - Hand the transaction to the pipeline and replay its result
//! - Serve until the shutdown signal fires

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use futures_util::FutureExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::forwarding::translate::{BAD_REQUEST, INTERNAL_ERROR, PAYLOAD_TOO_LARGE};
use crate::http::capture::{CaptureError, CapturedBody};
use crate::http::request::{InboundRequest, RequestId};
use crate::http::response::OutboundResult;
use crate::observability::{metrics, LogSink, TracingSink};
use crate::pipeline::{Clock, Pipeline, SystemClock};

/// Peer address used when the transport did not supply one.
const UNKNOWN_PEER: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub max_request_body_bytes: usize,
    pub log_limit: Option<usize>,
}

/// HTTP server for the capture proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server that logs through `tracing` on the system clock.
    pub fn new(config: ProxyConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink), Arc::new(SystemClock))
    }

    /// Create a server with an explicit log sink and clock.
    pub fn with_sink(config: ProxyConfig, sink: Arc<dyn LogSink>, clock: Arc<dyn Clock>) -> Self {
        let state = AppState {
            pipeline: Pipeline::new(&config, sink, clock),
            max_request_body_bytes: config.limits.max_request_body_bytes,
            log_limit: config.logging.body_limit(),
        };
        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(relay_handler))
            .route("/", any(relay_handler))
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            destination = %self.config.destination.host,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Relay handler for every method and path.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let received_at = state.pipeline.clock().now_millis();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .unwrap_or(UNKNOWN_PEER);

    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();

    let (body, rejection) =
        match CapturedBody::capture(body, state.max_request_body_bytes, state.log_limit).await {
            Ok(body) => (body, None),
            Err(e) => {
                let (status, message) = match &e {
                    CaptureError::TooLarge { limit } => {
                        tracing::warn!(method = %method, path = %parts.uri.path(), limit, "Request body too large");
                        (StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE)
                    }
                    CaptureError::Read(_) => {
                        tracing::warn!(method = %method, path = %parts.uri.path(), error = %e, "Failed to read request body");
                        (StatusCode::BAD_REQUEST, BAD_REQUEST)
                    }
                };
                (CapturedBody::empty(), Some((status, message, e)))
            }
        };

    let inbound = InboundRequest::from_parts(&parts, body, remote_addr, received_at);
    let request_id = RequestId::from_headers(&inbound.headers);

    let (request_id, result) = match rejection {
        Some((status, message, e)) => {
            state.pipeline.reject(inbound, request_id, status, message, e.to_string())
        }
        None => relay(&state.pipeline, inbound, request_id).await,
    };

    metrics::record_transaction(&method, result.status, start);
    result.into_client_response(&request_id)
}

/// Run the pipeline; a panic inside it still closes the transaction with 500.
async fn relay(
    pipeline: &Pipeline,
    inbound: InboundRequest,
    request_id: RequestId,
) -> (RequestId, OutboundResult) {
    tracing::debug!(
        request_id = %request_id,
        method = %inbound.method,
        path = %inbound.path,
        "Relaying request"
    );

    let snapshot = inbound.clone();
    match AssertUnwindSafe(pipeline.handle_with_id(inbound, request_id.clone()))
        .catch_unwind()
        .await
    {
        Ok(done) => done,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(request_id = %request_id, panic = %message, "Transaction panicked");
            pipeline.reject(
                snapshot,
                request_id,
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR,
                format!("panic: {}", message),
            )
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> axum::http::Response<String> {
    tracing::error!(panic = %panic_message(panic.as_ref()), "Request handler panicked");
    let mut response = axum::http::Response::new(INTERNAL_ERROR.to_string());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::observability::{LogEvent, LogRecord, MemorySink};
    use crate::pipeline::ManualClock;
    use tower::ServiceExt;

    /// Panics on its first emit, then records like `MemorySink`.
    #[derive(Default)]
    struct PanicOnceSink {
        tripped: AtomicBool,
        records: MemorySink,
    }

    impl LogSink for PanicOnceSink {
        fn emit(&self, event: LogEvent, record: &LogRecord) {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                panic!("sink exploded");
            }
            self.records.emit(event, record);
        }
    }

    fn server(destination: &str, sink: Arc<dyn LogSink>) -> HttpServer {
        let mut config = ProxyConfig::default();
        config.destination.host = destination.into();
        config.limits.max_request_body_bytes = 8;
        HttpServer::with_sink(config, sink, Arc::new(ManualClock::new(1_000, 0)))
    }

    #[tokio::test]
    async fn root_path_is_relayed_without_connect_info() {
        let sink = Arc::new(MemorySink::new());
        let app = server("http://bad host", sink.clone()).router();

        let request = Request::builder()
            .uri("/?a=1")
            .header("x-request-id", "root-1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("x-request-id").unwrap(), "root-1");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Inadequate URI");

        let records = sink.take();
        assert_eq!(records[0].0, LogEvent::Request);
        assert_eq!(records[0].1.get_str("path"), Some("/"));
        assert_eq!(records[0].1.get_str("remote_ip"), Some("0.0.0.0"));
    }

    #[tokio::test]
    async fn oversized_body_is_refused() {
        let sink = Arc::new(MemorySink::new());
        let app = server("http://127.0.0.1:9", sink.clone()).router();

        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .body(Body::from("far more than eight bytes"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Payload Too Large");

        let records = sink.take();
        let events: Vec<_> = records.iter().map(|(e, _)| *e).collect();
        assert_eq!(events, vec![LogEvent::Request, LogEvent::Response]);
        assert_eq!(records[0].1.get_str("method"), Some("POST"));
        assert_eq!(records[1].1.get_str("status_code"), Some("413 PAYLOAD_TOO_LARGE"));
        assert!(records[1].1.get_str("error").is_some());
    }

    #[tokio::test]
    async fn panic_in_pipeline_still_logs_both_records() {
        let sink = Arc::new(PanicOnceSink::default());
        let app = server("http://bad host", sink.clone()).router();

        let request = Request::builder()
            .uri("/explode")
            .header("x-request-id", "boom-1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().get("x-request-id").unwrap(), "boom-1");

        let records = sink.records.take();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1.get_str("path"), Some("/explode"));
        assert_eq!(records[1].1.get_str("status_code"), Some("500 INTERNAL_SERVER_ERROR"));
        assert_eq!(records[1].1.get_str("body"), Some(INTERNAL_ERROR));
        assert_eq!(records[1].1.get_str("error"), Some("panic: sink exploded"));
    }

    #[test]
    fn panic_payloads_are_described() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }

    #[test]
    fn panic_becomes_internal_error() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body(), INTERNAL_ERROR);
    }
}
