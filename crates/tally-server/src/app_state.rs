//! Shared application state.
//!
//! Owns the metrics registry and the request instruments registered in it,
//! plus the heavy task behind `/slow`. Everything is constructed here and
//! injected into the router; nothing is process-global, so tests build a
//! fresh state per case.

use std::sync::Arc;

use tally_core::error::Result;
use tally_core::metrics::Registry;
use tokio::time::Duration;

use crate::config::ServerConfig;
use crate::obs::{collect_default_metrics, DefaultMetrics, HttpMetrics};
use crate::sim::{HeavyTask, SimulatedHeavyTask};

#[derive(Clone)]
pub struct AppState {
    registry: Arc<Registry>,
    http_metrics: Arc<HttpMetrics>,
    heavy_task: Arc<dyn HeavyTask>,
    defaults: Option<DefaultMetrics>,
}

impl AppState {
    /// Build state from config with the simulated heavy task.
    pub fn new(cfg: &ServerConfig) -> Result<Self> {
        let task = Arc::new(SimulatedHeavyTask::new(&cfg.heavy_task));
        Self::with_heavy_task(cfg, task)
    }

    /// Build state with a caller-supplied heavy task.
    ///
    /// Default collectors are registered first, then the request histogram
    /// and counter; scrapes render in that order.
    pub fn with_heavy_task(cfg: &ServerConfig, heavy_task: Arc<dyn HeavyTask>) -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let defaults = if cfg.metrics.default_metrics {
            let interval = Duration::from_millis(cfg.metrics.collect_interval_ms);
            Some(collect_default_metrics(&registry, interval)?)
        } else {
            None
        };
        let http_metrics = Arc::new(HttpMetrics::register(&registry)?);

        Ok(Self { registry, http_metrics, heavy_task, defaults })
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn http_metrics(&self) -> Arc<HttpMetrics> {
        Arc::clone(&self.http_metrics)
    }

    pub fn heavy_task(&self) -> Arc<dyn HeavyTask> {
        Arc::clone(&self.heavy_task)
    }

    /// Handles to the default collectors, when enabled.
    pub fn defaults(&self) -> Option<&DefaultMetrics> {
        self.defaults.as_ref()
    }
}
