//! Metric instruments and the registry that renders them.
//!
//! Instruments store their state in atomics (counter, gauge) or in a
//! `DashMap` of per-series cells (histogram). Rendering follows the
//! Prometheus text exposition format, version 0.0.4.

pub mod counter;
pub mod gauge;
pub mod histogram;
pub mod registry;
pub mod text;

pub use counter::Counter;
pub use gauge::Gauge;
pub use histogram::HistogramVec;
pub use registry::Registry;

/// Content type served alongside the exposition body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Metric family type, as written on the `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Anything the registry can render.
///
/// A collector may emit several families (the process collector does);
/// `names` lists all of them so the registry can reject duplicates.
pub trait Collector: Send + Sync {
    /// Family names this collector writes.
    fn names(&self) -> Vec<String>;

    /// Push one block per family onto `out`.
    ///
    /// A block is `# HELP`, `# TYPE`, then samples, each line terminated by
    /// a newline. Separation between blocks is the registry's job.
    fn render(&self, out: &mut Vec<String>);
}
