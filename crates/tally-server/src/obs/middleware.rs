//! Request instrumentation middleware.
//!
//! Recording happens in the `Drop` of a guard created when the request
//! enters the stack, so it runs exactly once whichever way the handler
//! exits:
//! - normal completion: the response's status
//! - handler panic (unwinding through the guard): 500
//! - request future dropped, e.g. the client disconnected: 200, the status
//!   of a response that was never written

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;

use crate::obs::HttpMetrics;

struct Exchange {
    metrics: Arc<HttpMetrics>,
    method: String,
    route: String,
    started: Instant,
    status: Option<StatusCode>,
}

impl Exchange {
    fn start(metrics: Arc<HttpMetrics>, req: &Request) -> Self {
        let uri = req.uri();
        let route = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Self {
            metrics,
            method: req.method().as_str().to_string(),
            route,
            started: Instant::now(),
            status: None,
        }
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        let status = self.status.unwrap_or(if std::thread::panicking() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        });
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;

        self.metrics
            .record(&self.method, &self.route, status.as_u16(), elapsed_ms);
    }
}

/// `axum::middleware::from_fn_with_state` entry point.
pub async fn track(
    State(metrics): State<Arc<HttpMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let mut exchange = Exchange::start(metrics, &req);
    let res = next.run(req).await;
    exchange.status = Some(res.status());
    res
}
