//! Log shipping to Grafana Loki.
//!
//! [`LokiLayer`] is a `tracing_subscriber` layer that turns each event into a
//! [`LogEntry`] and `try_send`s it onto a bounded queue. Callers never wait
//! on the network: a full or closed queue drops the entry and bumps a
//! counter. [`Shipper`] drains the queue in batches and hands them to a
//! [`LogSink`]; [`LokiSink`] POSTs them to `/loki/api/v1/push`.
//!
//! Events emitted from this module and from the HTTP client stack are not
//! forwarded, so a failing push cannot feed itself.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use tally_core::error::{Result, TallyError};

use crate::config::LokiConfig;

const IGNORED_TARGETS: [&str; 6] = [module_path!(), "reqwest", "hyper", "hyper_util", "h2", "rustls"];

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
    /// Value of an `error` field, if the event carried one.
    pub error: Option<String>,
    pub fields: BTreeMap<String, String>,
    pub timestamp: SystemTime,
}

impl LogEntry {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            error: None,
            fields: BTreeMap::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn level_str(&self) -> &'static str {
        if self.level == Level::ERROR {
            "error"
        } else if self.level == Level::WARN {
            "warn"
        } else if self.level == Level::INFO {
            "info"
        } else if self.level == Level::DEBUG {
            "debug"
        } else {
            "trace"
        }
    }

    /// JSON log line: `{"level", "message", "error"?, ...fields}`.
    pub fn to_line(&self) -> String {
        let mut obj = Map::new();
        obj.insert("level".into(), Value::from(self.level_str()));
        obj.insert("message".into(), Value::from(self.message.as_str()));
        if let Some(e) = &self.error {
            obj.insert("error".into(), Value::from(e.as_str()));
        }
        for (k, v) in &self.fields {
            obj.entry(k.clone()).or_insert_with(|| Value::from(v.as_str()));
        }
        Value::Object(obj).to_string()
    }

    fn unix_nanos(&self) -> String {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
            .to_string()
    }
}

struct EntryVisitor<'a>(&'a mut LogEntry);

impl EntryVisitor<'_> {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.0.message = value,
            "error" => self.0.error = Some(value),
            name => {
                self.0.fields.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for EntryVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

/// Layer feeding the shipping queue.
pub struct LokiLayer {
    tx: mpsc::Sender<LogEntry>,
    dropped: Arc<AtomicU64>,
}

impl LokiLayer {
    /// Entries lost to a full or closed queue.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<S: Subscriber> Layer<S> for LokiLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if IGNORED_TARGETS.iter().any(|t| meta.target().starts_with(t)) {
            return;
        }

        let mut entry = LogEntry::new(*meta.level(), String::new());
        event.record(&mut EntryVisitor(&mut entry));

        if self.tx.try_send(entry).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Destination for shipped batches.
#[async_trait]
pub trait LogSink: Send + Sync + 'static {
    async fn ship(&self, batch: &[LogEntry]) -> Result<()>;
}

/// Queue consumer. Build with [`channel`].
pub struct Shipper {
    rx: mpsc::Receiver<LogEntry>,
    batch_size: usize,
    batch_interval: Duration,
    dropped: Arc<AtomicU64>,
}

/// Create a connected layer/shipper pair.
pub fn channel(capacity: usize, batch_size: usize, batch_interval: Duration) -> (LokiLayer, Shipper) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        LokiLayer { tx, dropped: Arc::clone(&dropped) },
        Shipper { rx, batch_size: batch_size.max(1), batch_interval, dropped },
    )
}

impl Shipper {
    /// Ship until every layer is gone or `stop` resolves, then drain what is
    /// queued and flush once more.
    pub async fn run<K, F>(mut self, sink: K, stop: F)
    where
        K: LogSink,
        F: Future<Output = ()> + Send,
    {
        let mut ticker = tokio::time::interval(self.batch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(stop);

        let mut batch = Vec::with_capacity(self.batch_size);
        loop {
            tokio::select! {
                maybe = self.rx.recv() => match maybe {
                    Some(entry) => {
                        batch.push(entry);
                        if batch.len() >= self.batch_size {
                            flush(&sink, &mut batch).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => flush(&sink, &mut batch).await,
                _ = &mut stop => {
                    self.rx.close();
                    while let Ok(entry) = self.rx.try_recv() {
                        batch.push(entry);
                    }
                    break;
                }
            }
        }
        flush(&sink, &mut batch).await;

        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            tracing::warn!(dropped, "log entries dropped before shipping");
        }
    }
}

async fn flush<K: LogSink>(sink: &K, batch: &mut Vec<LogEntry>) {
    if batch.is_empty() {
        return;
    }
    let entries = std::mem::take(batch);
    if let Err(e) = sink.ship(&entries).await {
        tracing::warn!(error = %e, entries = entries.len(), "log batch not delivered");
    }
}

/// Loki push API client.
pub struct LokiSink {
    client: reqwest::Client,
    url: String,
    labels: BTreeMap<String, String>,
}

impl LokiSink {
    pub fn new(cfg: &LokiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| TallyError::LogShipping(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/loki/api/v1/push", cfg.host.trim_end_matches('/')),
            labels: cfg.labels.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push body: one stream per level, static labels plus `level`.
    pub fn push_body(&self, batch: &[LogEntry]) -> Value {
        let mut by_level: BTreeMap<&'static str, Vec<Value>> = BTreeMap::new();
        for e in batch {
            by_level
                .entry(e.level_str())
                .or_default()
                .push(json!([e.unix_nanos(), e.to_line()]));
        }

        let streams: Vec<Value> = by_level
            .into_iter()
            .map(|(level, values)| {
                let mut labels: Map<String, Value> = self
                    .labels
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                    .collect();
                labels.insert("level".into(), Value::from(level));
                json!({ "stream": labels, "values": values })
            })
            .collect();

        json!({ "streams": streams })
    }
}

#[async_trait]
impl LogSink for LokiSink {
    async fn ship(&self, batch: &[LogEntry]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let res = self
            .client
            .post(&self.url)
            .json(&self.push_body(batch))
            .send()
            .await
            .map_err(|e| TallyError::LogShipping(format!("push failed: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            return Err(TallyError::LogShipping(format!("loki responded {status}")));
        }
        Ok(())
    }
}

/// Running shipper task.
pub struct LokiHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl LokiHandle {
    /// Stop accepting, flush what is queued, and wait for the task.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}

/// Build the layer and spawn its shipper against the configured Loki.
pub fn spawn(cfg: &LokiConfig) -> Result<(LokiLayer, LokiHandle)> {
    let (layer, shipper) = channel(
        cfg.queue_capacity,
        cfg.batch_size,
        Duration::from_millis(cfg.batch_interval_ms),
    );
    let sink = LokiSink::new(cfg)?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(shipper.run(sink, async move {
        let _ = stop_rx.await;
    }));
    Ok((layer, LokiHandle { stop: stop_tx, task }))
}
