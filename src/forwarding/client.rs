//! Pooled upstream HTTP client.
//!
//! # Responsibilities
//! - Own the hyper connection pool for the destination
//! - Apply connect, response and pool-wait timeouts
//! - Cap concurrent upstream exchanges at the route limit
//!
//! # Design Decisions
//! - One attempt per call; nothing here retries
//! - The response timer runs once a connection is ready; opening a new
//!   connection is bounded by the connect timeout alone
//! - The response timeout covers headers and the full body
//! - Dropping the returned future abandons the exchange and frees its slot

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tower::Service;

use crate::config::{PoolConfig, TimeoutConfig};
use crate::forwarding::error::{classify, ForwardError, TransportErrorKind};

tokio::task_local! {
    static CONNECT_PHASE: Arc<ConnectPhase>;
}

/// Connection progress of one exchange.
#[derive(Debug, Default)]
struct ConnectPhase {
    connecting: AtomicBool,
    connected_at: Mutex<Option<Instant>>,
}

impl ConnectPhase {
    fn begin(&self) {
        self.connecting.store(true, Ordering::SeqCst);
    }

    fn finish(&self, connected: bool) {
        if connected {
            if let Ok(mut at) = self.connected_at.lock() {
                *at = Some(Instant::now());
            }
        }
        self.connecting.store(false, Ordering::SeqCst);
    }

    /// Where the response deadline lies as of `now`, or `None` once it has passed.
    ///
    /// The timer counts from `started`, or from when a fresh connection came
    /// up. While a connection is still opening the deadline keeps moving.
    fn response_deadline(&self, started: Instant, timeout: Duration, now: Instant) -> Option<Instant> {
        if self.connecting.load(Ordering::SeqCst) {
            return Some(now + timeout);
        }
        let from = self
            .connected_at
            .lock()
            .ok()
            .and_then(|at| *at)
            .map_or(started, |at| at.max(started));
        let deadline = from + timeout;
        (deadline > now).then_some(deadline)
    }
}

/// `HttpConnector` that reports connection progress to the exchange polling it.
#[derive(Clone)]
struct PhaseConnector {
    inner: HttpConnector,
}

impl Service<Uri> for PhaseConnector {
    type Response = <HttpConnector as Service<Uri>>::Response;
    type Error = <HttpConnector as Service<Uri>>::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let phase = CONNECT_PHASE.try_with(Arc::clone).ok();
        if let Some(phase) = &phase {
            phase.begin();
        }
        let connecting = self.inner.call(dst);
        Box::pin(async move {
            let result = connecting.await;
            if let Some(phase) = phase {
                phase.finish(result.is_ok());
            }
            result
        })
    }
}

/// Client for the single configured upstream.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<PhaseConnector, Body>,
    permits: Arc<Semaphore>,
    response_timeout: Duration,
    connection_request_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(timeouts: &TimeoutConfig, pool: &PoolConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(pool.route_limit())
            .pool_idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
            .build(PhaseConnector { inner: connector });

        Self {
            client,
            permits: Arc::new(Semaphore::new(pool.route_limit())),
            response_timeout: timeouts.response(),
            connection_request_timeout: timeouts.connection_request(),
        }
    }

    /// Execute `request` and buffer the whole reply.
    pub async fn execute(
        &self,
        request: Request<Body>,
    ) -> Result<Response<Bytes>, ForwardError> {
        let _permit = tokio::time::timeout(
            self.connection_request_timeout,
            self.permits.clone().acquire_owned(),
        )
        .await
        .map_err(|_| {
            ForwardError::transport(
                TransportErrorKind::ConnectTimeout,
                format!(
                    "no upstream connection available within {}ms",
                    self.connection_request_timeout.as_millis()
                ),
            )
        })?
        .map_err(|_| ForwardError::Internal("upstream pool closed".into()))?;

        let started = Instant::now();
        let phase = Arc::new(ConnectPhase::default());
        let exchange = CONNECT_PHASE.scope(phase.clone(), self.exchange(request));
        tokio::pin!(exchange);

        let mut deadline = started + self.response_timeout;
        loop {
            tokio::select! {
                result = &mut exchange => return result,
                _ = tokio::time::sleep_until(deadline) => {
                    match phase.response_deadline(started, self.response_timeout, Instant::now()) {
                        Some(next) => deadline = next,
                        None => {
                            return Err(ForwardError::transport(
                                TransportErrorKind::ReadTimeout,
                                format!(
                                    "no complete response within {}ms",
                                    self.response_timeout.as_millis()
                                ),
                            ))
                        }
                    }
                }
            }
        }
    }

    async fn exchange(&self, request: Request<Body>) -> Result<Response<Bytes>, ForwardError> {
        let response = self.client.request(request).await.map_err(|e| {
            let kind = classify(&e, e.is_connect());
            ForwardError::transport(kind, e.to_string())
        })?;
        read_body(response).await
    }
}

async fn read_body(response: Response<Incoming>) -> Result<Response<Bytes>, ForwardError> {
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(Body::new(body), usize::MAX)
        .await
        .map_err(|e| {
            ForwardError::transport(classify(&e, false), format!("failed reading upstream body: {}", e))
        })?;
    Ok(Response::from_parts(parts, bytes))
}
