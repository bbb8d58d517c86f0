//! The two request instruments: a total-request counter and a
//! response-time histogram.
//!
//! The histogram's `route` label is the raw request target (path and query
//! as received), not a route template. Every distinct URL becomes its own
//! series; that cardinality growth is accepted as-is.

use std::sync::Arc;

use tally_core::error::Result;
use tally_core::metrics::{Counter, HistogramVec, Registry};

pub const TOTAL_REQUEST: &str = "total_request";
pub const REQ_RES_TIME: &str = "http_express_server_req_res_time";

/// Bucket upper bounds in milliseconds.
pub const REQUEST_BUCKETS_MS: [f64; 9] =
    [1.0, 50.0, 100.0, 200.0, 400.0, 500.0, 800.0, 1000.0, 2000.0];

pub struct HttpMetrics {
    total_request: Arc<Counter>,
    req_res_time: Arc<HistogramVec<3>>,
}

impl HttpMetrics {
    /// Create both instruments and register them with `registry`.
    pub fn register(registry: &Registry) -> Result<Self> {
        let total_request = Arc::new(Counter::new(TOTAL_REQUEST, "This tells total request")?);
        let req_res_time = Arc::new(HistogramVec::new(
            REQ_RES_TIME,
            "This tells how much time is taken by req and res",
            ["method", "route", "status_code"],
            &REQUEST_BUCKETS_MS,
        )?);

        registry.register(req_res_time.clone())?;
        registry.register(total_request.clone())?;

        Ok(Self { total_request, req_res_time })
    }

    /// Record one finished request.
    pub fn record(&self, method: &str, route: &str, status_code: u16, elapsed_ms: f64) {
        self.total_request.inc();
        let status = status_code.to_string();
        self.req_res_time.observe([method, route, status.as_str()], elapsed_ms);
    }

    pub fn total_request(&self) -> &Counter {
        &self.total_request
    }

    pub fn req_res_time(&self) -> &HistogramVec<3> {
        &self.req_res_time
    }
}
