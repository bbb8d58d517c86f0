use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::metrics::{text, Collector, MetricKind};

/// Unlabeled monotonic counter.
#[derive(Debug)]
pub struct Counter {
    name: String,
    help: String,
    value: AtomicU64,
}

impl Counter {
    pub fn new(name: &str, help: &str) -> Result<Self> {
        text::check_metric_name(name)?;
        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            value: AtomicU64::new(0),
        })
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Increment by an arbitrary value.
    pub fn inc_by(&self, v: u64) {
        self.value.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Collector for Counter {
    fn names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn render(&self, out: &mut Vec<String>) {
        let mut block = String::new();
        text::write_header(&mut block, &self.name, &self.help, MetricKind::Counter);
        let _ = writeln!(block, "{} {}", self.name, self.get());
        out.push(block);
    }
}
