use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::metrics::{text, Collector, MetricKind};

/// Unlabeled gauge holding an `f64` (stored as raw bits).
#[derive(Debug)]
pub struct Gauge {
    name: String,
    help: String,
    bits: AtomicU64,
}

impl Gauge {
    pub fn new(name: &str, help: &str) -> Result<Self> {
        text::check_metric_name(name)?;
        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            bits: AtomicU64::new(0f64.to_bits()),
        })
    }

    pub fn set(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl Collector for Gauge {
    fn names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn render(&self, out: &mut Vec<String>) {
        let mut block = String::new();
        text::write_header(&mut block, &self.name, &self.help, MetricKind::Gauge);
        let _ = writeln!(block, "{} {}", self.name, text::format_value(self.get()));
        out.push(block);
    }
}
