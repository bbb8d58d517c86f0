//! Labeled histogram with caller-supplied bucket bounds.
//!
//! Label arity is a const generic, so every observation carries exactly the
//! label set the family was declared with. Series are created lazily on
//! first observation and live for the lifetime of the instrument; label
//! values are not normalized, so a label fed from raw request paths grows
//! one series per distinct path.

use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;

use crate::error::{Result, TallyError};
use crate::metrics::{text, Collector, MetricKind};

#[derive(Debug, Clone)]
struct Series {
    /// Cumulative: `buckets[i]` counts observations `<= bounds[i]`.
    buckets: Vec<u64>,
    sum: f64,
    count: u64,
}

impl Series {
    fn new(len: usize) -> Self {
        Self { buckets: vec![0; len], sum: 0.0, count: 0 }
    }
}

/// Point-in-time copy of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(upper bound, cumulative count)` per finite bucket.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

#[derive(Debug)]
pub struct HistogramVec<const N: usize> {
    name: String,
    help: String,
    label_names: [&'static str; N],
    bounds: Vec<f64>,
    map: DashMap<[String; N], Mutex<Series>>,
}

impl<const N: usize> HistogramVec<N> {
    /// Bounds must be non-empty, finite, and strictly ascending. The `+Inf`
    /// bucket is implicit.
    pub fn new(
        name: &str,
        help: &str,
        label_names: [&'static str; N],
        bounds: &[f64],
    ) -> Result<Self> {
        text::check_metric_name(name)?;
        for l in label_names {
            text::check_label_name(l)?;
        }
        if bounds.is_empty() {
            return Err(TallyError::InvalidMetric(format!("{name}: buckets must not be empty")));
        }
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(TallyError::InvalidMetric(format!("{name}: buckets must be finite")));
        }
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TallyError::InvalidMetric(format!(
                "{name}: buckets must be strictly ascending"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names,
            bounds: bounds.to_vec(),
            map: DashMap::new(),
        })
    }

    /// Record one observation for the given label values (declaration order).
    pub fn observe(&self, labels: [&str; N], value: f64) {
        let key = labels.map(str::to_owned);

        // Existing series take the shared shard lock only.
        if let Some(cell) = self.map.get(&key) {
            self.record(&cell, value);
            return;
        }
        let cell = self
            .map
            .entry(key)
            .or_insert_with(|| Mutex::new(Series::new(self.bounds.len())));
        self.record(&cell, value);
    }

    fn record(&self, cell: &Mutex<Series>, value: f64) {
        let mut s = cell.lock().unwrap_or_else(PoisonError::into_inner);
        s.count += 1;
        s.sum += value;
        for (i, &b) in self.bounds.iter().enumerate() {
            if value <= b {
                s.buckets[i] += 1;
            }
        }
    }

    /// Copy of one series, if it has been observed.
    pub fn snapshot(&self, labels: [&str; N]) -> Option<HistogramSnapshot> {
        let key = labels.map(str::to_owned);
        let cell = self.map.get(&key)?;
        let s = cell.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Some(HistogramSnapshot {
            buckets: self.bounds.iter().copied().zip(s.buckets).collect(),
            sum: s.sum,
            count: s.count,
        })
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Number of distinct label sets observed so far.
    pub fn series_len(&self) -> usize {
        self.map.len()
    }
}

impl<const N: usize> Collector for HistogramVec<N> {
    fn names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn render(&self, out: &mut Vec<String>) {
        let mut block = String::new();
        text::write_header(&mut block, &self.name, &self.help, MetricKind::Histogram);

        // Copy out under the locks, then format without holding anything.
        let mut rows: Vec<([String; N], Series)> = self
            .map
            .iter()
            .map(|r| {
                let s = r.value().lock().unwrap_or_else(PoisonError::into_inner).clone();
                (r.key().clone(), s)
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, s) in rows {
            let label_str = text::label_pairs(
                self.label_names.iter().copied().zip(key.iter().map(String::as_str)),
            );
            let prefix = if label_str.is_empty() { String::new() } else { format!(",{label_str}") };
            let braced = if label_str.is_empty() { String::new() } else { format!("{{{label_str}}}") };

            for (i, &le) in self.bounds.iter().enumerate() {
                let _ = writeln!(
                    block,
                    "{}_bucket{{le=\"{}\"{}}} {}",
                    self.name,
                    text::format_value(le),
                    prefix,
                    s.buckets[i]
                );
            }
            let _ = writeln!(block, "{}_bucket{{le=\"+Inf\"{}}} {}", self.name, prefix, s.count);
            let _ = writeln!(block, "{}_sum{} {}", self.name, braced, text::format_value(s.sum));
            let _ = writeln!(block, "{}_count{} {}", self.name, braced, s.count);
        }
        out.push(block);
    }
}
