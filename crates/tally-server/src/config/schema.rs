use std::collections::BTreeMap;

use serde::Deserialize;
use tally_core::error::{Result, TallyError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub heavy_task: HeavyTaskConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
            logging: LoggingSection::default(),
            heavy_task: HeavyTaskConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TallyError::BadConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.metrics.validate()?;
        self.logging.loki.validate()?;
        self.heavy_task.validate()?;
        Ok(())
    }

    /// `host:port` string to bind.
    pub fn listen(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    9000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Register process/runtime collectors.
    #[serde(default = "default_true")]
    pub default_metrics: bool,

    #[serde(default = "default_collect_interval_ms")]
    pub collect_interval_ms: u64,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            default_metrics: true,
            collect_interval_ms: default_collect_interval_ms(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=300000).contains(&self.collect_interval_ms) {
            return Err(TallyError::BadConfig(
                "metrics.collect_interval_ms must be between 1000 and 300000".into(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_collect_interval_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default)]
    pub loki: LokiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LokiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the Loki server; the push path is appended.
    #[serde(default = "default_loki_host")]
    pub host: String,

    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Static stream labels attached to every pushed entry.
    #[serde(default = "default_labels")]
    pub labels: BTreeMap<String, String>,
}

impl Default for LokiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_loki_host(),
            batch_interval_ms: default_batch_interval_ms(),
            batch_size: default_batch_size(),
            queue_capacity: default_queue_capacity(),
            labels: default_labels(),
        }
    }
}

impl LokiConfig {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60000).contains(&self.batch_interval_ms) {
            return Err(TallyError::BadConfig(
                "logging.loki.batch_interval_ms must be between 100 and 60000".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(TallyError::BadConfig("logging.loki.batch_size must be >= 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(TallyError::BadConfig("logging.loki.queue_capacity must be >= 1".into()));
        }
        if self.enabled && !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(TallyError::BadConfig(
                "logging.loki.host must start with http:// or https://".into(),
            ));
        }
        Ok(())
    }
}

fn default_loki_host() -> String {
    "http://127.0.0.1:3100".into()
}
fn default_batch_interval_ms() -> u64 {
    5000
}
fn default_batch_size() -> usize {
    100
}
fn default_queue_capacity() -> usize {
    1024
}
fn default_labels() -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), "tally".to_string())])
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeavyTaskConfig {
    /// Candidate pauses; one is picked at random per run.
    #[serde(default = "default_delays_ms")]
    pub delays_ms: Vec<u64>,

    /// 1-in-N chance that a run fails. 0 disables failures.
    #[serde(default = "default_failure_one_in")]
    pub failure_one_in: u32,
}

impl Default for HeavyTaskConfig {
    fn default() -> Self {
        Self {
            delays_ms: default_delays_ms(),
            failure_one_in: default_failure_one_in(),
        }
    }
}

impl HeavyTaskConfig {
    pub fn validate(&self) -> Result<()> {
        if self.delays_ms.is_empty() {
            return Err(TallyError::BadConfig("heavy_task.delays_ms must not be empty".into()));
        }
        Ok(())
    }
}

fn default_delays_ms() -> Vec<u64> {
    vec![100, 150, 200, 300, 600, 500, 1000, 1400, 2500]
}
fn default_failure_one_in() -> u32 {
    8
}
