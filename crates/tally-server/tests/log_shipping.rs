#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

use tally_core::error::{Result, TallyError};
use tally_server::config::LokiConfig;
use tally_server::obs::loki::{self, LogEntry, LogSink, LokiSink};

#[derive(Clone, Default)]
struct MemorySink {
    batches: Arc<Mutex<Vec<Vec<LogEntry>>>>,
}

impl MemorySink {
    fn entries(&self) -> Vec<LogEntry> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn ship(&self, batch: &[LogEntry]) -> Result<()> {
        self.batches.lock().unwrap().push(batch.to_vec());
        Ok(())
    }
}

struct DownSink;

#[async_trait]
impl LogSink for DownSink {
    async fn ship(&self, _batch: &[LogEntry]) -> Result<()> {
        Err(TallyError::LogShipping("connection refused".into()))
    }
}

#[tokio::test]
async fn events_become_entries_with_error_detail() {
    let (layer, shipper) = loki::channel(16, 100, Duration::from_secs(60));
    let sink = MemorySink::default();

    tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
        tracing::info!("request came on / route");
        tracing::error!(error = %"DB Server is Down", "error came on /slow route");
    });
    shipper.run(sink.clone(), std::future::pending()).await;

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].level, Level::INFO);
    assert_eq!(entries[0].message, "request came on / route");
    assert_eq!(entries[0].error, None);

    assert_eq!(entries[1].level, Level::ERROR);
    assert_eq!(entries[1].message, "error came on /slow route");
    assert_eq!(entries[1].error.as_deref(), Some("DB Server is Down"));
}

#[tokio::test]
async fn batches_respect_batch_size() {
    let (layer, shipper) = loki::channel(16, 2, Duration::from_secs(60));
    let sink = MemorySink::default();

    tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
        for i in 0..5 {
            tracing::info!(i, "tick");
        }
    });
    shipper.run(sink.clone(), std::future::pending()).await;

    let batches = sink.batches.lock().unwrap().clone();
    assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= 2));
    let all: Vec<String> = batches
        .iter()
        .flatten()
        .map(|e| e.fields.get("i").cloned().unwrap())
        .collect();
    assert_eq!(all, vec!["0", "1", "2", "3", "4"]);
}

#[tokio::test]
async fn full_queue_drops_instead_of_blocking() {
    let (layer, shipper) = loki::channel(1, 100, Duration::from_secs(60));
    let sink = MemorySink::default();

    tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
        tracing::info!("kept");
        tracing::info!("dropped");
        tracing::info!("dropped too");
    });
    shipper.run(sink.clone(), std::future::pending()).await;

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "kept");
}

#[tokio::test]
async fn unreachable_backend_does_not_fail_the_shipper() {
    let (layer, shipper) = loki::channel(16, 1, Duration::from_secs(60));

    tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
        tracing::error!(error = %"boom", "error came on /slow route");
        tracing::info!("still logging");
    });

    // Completes even though every push fails.
    shipper.run(DownSink, std::future::pending()).await;
}

#[tokio::test]
async fn stop_drains_queued_entries() {
    let (layer, shipper) = loki::channel(16, 100, Duration::from_secs(60));
    let sink = MemorySink::default();

    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));
    tracing::info!("queued before stop");

    // The layer is still alive; only the stop signal ends the run.
    shipper.run(sink.clone(), async {}).await;

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "queued before stop");
}

#[tokio::test]
async fn shipper_and_http_client_events_are_not_forwarded() {
    let (layer, shipper) = loki::channel(16, 100, Duration::from_secs(60));
    let sink = MemorySink::default();

    tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
        tracing::warn!(target: "tally_server::obs::loki", "log batch not delivered");
        tracing::debug!(target: "hyper::proto::h1", "parsed headers");
        tracing::info!("app event");
    });
    shipper.run(sink.clone(), std::future::pending()).await;

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "app event");
}

#[test]
fn push_body_groups_streams_by_level() {
    let cfg = LokiConfig { host: "http://loki.local:3100/".into(), ..LokiConfig::default() };
    let sink = LokiSink::new(&cfg).unwrap();
    assert_eq!(sink.url(), "http://loki.local:3100/loki/api/v1/push");

    let mut failed = LogEntry::new(Level::ERROR, "error came on /slow route");
    failed.error = Some("Access Denied".into());
    let batch = vec![
        LogEntry::new(Level::INFO, "request came on / route"),
        failed,
        LogEntry::new(Level::INFO, "request came on /slow route"),
    ];

    let body = sink.push_body(&batch);
    let streams = body["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 2);

    let error = &streams[0];
    assert_eq!(error["stream"]["level"], "error");
    assert_eq!(error["stream"]["app"], "tally");
    let values = error["values"].as_array().unwrap();
    assert_eq!(values.len(), 1);
    assert!(values[0][0].as_str().unwrap().parse::<u128>().is_ok());
    let line: serde_json::Value = serde_json::from_str(values[0][1].as_str().unwrap()).unwrap();
    assert_eq!(line["message"], "error came on /slow route");
    assert_eq!(line["error"], "Access Denied");

    let info = &streams[1];
    assert_eq!(info["stream"]["level"], "info");
    assert_eq!(info["values"].as_array().unwrap().len(), 2);
}

#[test]
fn entry_line_is_json() {
    let mut e = LogEntry::new(Level::WARN, "careful");
    e.fields.insert("attempt".into(), "3".into());
    let line: serde_json::Value = serde_json::from_str(&e.to_line()).unwrap();
    assert_eq!(line["level"], "warn");
    assert_eq!(line["message"], "careful");
    assert_eq!(line["attempt"], "3");
    assert!(line.get("error").is_none());
}
