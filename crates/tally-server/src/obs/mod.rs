//! Observability: request instrumentation, default process/runtime
//! metrics, and log shipping.

pub mod defaults;
pub mod http_metrics;
pub mod loki;
pub mod middleware;

pub use defaults::{collect_default_metrics, DefaultMetrics};
pub use http_metrics::HttpMetrics;
