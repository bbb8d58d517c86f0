//! Default process and runtime metrics, sampled on an interval.
//!
//! Process figures are read from `/proc/self` on Linux. Elsewhere only the
//! start time is reported. Runtime figures come from the tokio handle the
//! sampler runs on.

use std::fmt::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use tally_core::error::Result;
use tally_core::metrics::{text, Collector, Gauge, MetricKind, Registry};

/// Clock ticks per second for `/proc/<pid>/stat` cpu fields (USER_HZ).
const CLOCK_TICKS: f64 = 100.0;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProcessSample {
    pub cpu_user_seconds: Option<f64>,
    pub cpu_system_seconds: Option<f64>,
    pub resident_memory_bytes: Option<u64>,
    pub virtual_memory_bytes: Option<u64>,
    pub open_fds: Option<u64>,
    pub max_fds: Option<u64>,
}

impl ProcessSample {
    #[cfg(target_os = "linux")]
    pub fn read() -> Self {
        let mut s = Self::default();

        if let Ok(stat) = std::fs::read_to_string("/proc/self/stat") {
            if let Some((utime, stime)) = parse_stat_cpu(&stat) {
                s.cpu_user_seconds = Some(utime as f64 / CLOCK_TICKS);
                s.cpu_system_seconds = Some(stime as f64 / CLOCK_TICKS);
            }
        }
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            s.resident_memory_bytes = parse_status_kb(&status, "VmRSS:").map(|kb| kb * 1024);
            s.virtual_memory_bytes = parse_status_kb(&status, "VmSize:").map(|kb| kb * 1024);
        }
        if let Ok(dir) = std::fs::read_dir("/proc/self/fd") {
            s.open_fds = Some(dir.count() as u64);
        }
        if let Ok(limits) = std::fs::read_to_string("/proc/self/limits") {
            s.max_fds = parse_max_open_files(&limits);
        }
        s
    }

    #[cfg(not(target_os = "linux"))]
    pub fn read() -> Self {
        Self::default()
    }
}

/// `utime` and `stime` (fields 14 and 15) from `/proc/<pid>/stat`.
///
/// The command name (field 2) may contain spaces and parentheses, so
/// fields are counted from the last `)`.
pub fn parse_stat_cpu(stat: &str) -> Option<(u64, u64)> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    // `rest` starts at field 3 (state); utime is field 14.
    let utime = fields.nth(11)?.parse().ok()?;
    let stime = fields.next()?.parse().ok()?;
    Some((utime, stime))
}

/// Value in kB of a `/proc/<pid>/status` line such as `VmRSS:   1234 kB`.
pub fn parse_status_kb(status: &str, key: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|l| l.strip_prefix(key))
        .and_then(|v| v.split_whitespace().next())
        .and_then(|v| v.parse().ok())
}

/// Soft limit of the `Max open files` row in `/proc/<pid>/limits`.
pub fn parse_max_open_files(limits: &str) -> Option<u64> {
    limits
        .lines()
        .find_map(|l| l.strip_prefix("Max open files"))
        .and_then(|v| v.split_whitespace().next())
        .and_then(|v| v.parse().ok())
}

/// Renders the `process_*` families from the latest sample.
#[derive(Debug)]
pub struct ProcessCollector {
    start_time_seconds: f64,
    sample: Mutex<ProcessSample>,
}

impl ProcessCollector {
    pub fn new() -> Self {
        let start_time_seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64().floor())
            .unwrap_or_default();
        Self {
            start_time_seconds,
            sample: Mutex::new(ProcessSample::default()),
        }
    }

    pub fn refresh(&self) {
        self.set(ProcessSample::read());
    }

    pub fn set(&self, sample: ProcessSample) {
        *self.sample.lock().unwrap_or_else(PoisonError::into_inner) = sample;
    }

    fn family(out: &mut Vec<String>, name: &str, help: &str, kind: MetricKind, v: f64) {
        let mut block = String::new();
        text::write_header(&mut block, name, help, kind);
        let _ = writeln!(block, "{} {}", name, text::format_value(v));
        out.push(block);
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for ProcessCollector {
    fn names(&self) -> Vec<String> {
        [
            "process_cpu_user_seconds_total",
            "process_cpu_system_seconds_total",
            "process_cpu_seconds_total",
            "process_start_time_seconds",
            "process_resident_memory_bytes",
            "process_virtual_memory_bytes",
            "process_open_fds",
            "process_max_fds",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn render(&self, out: &mut Vec<String>) {
        let s = *self.sample.lock().unwrap_or_else(PoisonError::into_inner);

        if let (Some(user), Some(system)) = (s.cpu_user_seconds, s.cpu_system_seconds) {
            Self::family(
                out,
                "process_cpu_user_seconds_total",
                "Total user CPU time spent in seconds.",
                MetricKind::Counter,
                user,
            );
            Self::family(
                out,
                "process_cpu_system_seconds_total",
                "Total system CPU time spent in seconds.",
                MetricKind::Counter,
                system,
            );
            Self::family(
                out,
                "process_cpu_seconds_total",
                "Total user and system CPU time spent in seconds.",
                MetricKind::Counter,
                user + system,
            );
        }
        Self::family(
            out,
            "process_start_time_seconds",
            "Start time of the process since unix epoch in seconds.",
            MetricKind::Gauge,
            self.start_time_seconds,
        );

        let optional = [
            (
                "process_resident_memory_bytes",
                "Resident memory size in bytes.",
                s.resident_memory_bytes,
            ),
            (
                "process_virtual_memory_bytes",
                "Virtual memory size in bytes.",
                s.virtual_memory_bytes,
            ),
            ("process_open_fds", "Number of open file descriptors.", s.open_fds),
            ("process_max_fds", "Maximum number of open file descriptors.", s.max_fds),
        ];
        for (name, help, value) in optional {
            if let Some(v) = value {
                Self::family(out, name, help, MetricKind::Gauge, v as f64);
            }
        }
    }
}

/// Handles to the default collectors. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DefaultMetrics {
    process: Arc<ProcessCollector>,
    scheduler_lag: Arc<Gauge>,
    workers: Arc<Gauge>,
    alive_tasks: Arc<Gauge>,
    interval: Duration,
}

impl DefaultMetrics {
    /// Take one sample of everything. Must run inside a tokio runtime.
    pub async fn sample(&self) {
        self.process.refresh();

        // Time from yielding until the scheduler polls us again.
        let t = Instant::now();
        tokio::task::yield_now().await;
        self.scheduler_lag.set(t.elapsed().as_secs_f64());

        let rt = tokio::runtime::Handle::current().metrics();
        self.workers.set(rt.num_workers() as f64);
        self.alive_tasks.set(rt.num_alive_tasks() as f64);
    }

    /// Sample immediately, then on every interval tick, until the returned
    /// handle is aborted.
    pub fn spawn(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                this.sample().await;
            }
        })
    }
}

/// Register the process collector and runtime gauges with `registry`.
///
/// Nothing is sampled until [`DefaultMetrics::sample`] or
/// [`DefaultMetrics::spawn`] runs.
pub fn collect_default_metrics(registry: &Registry, interval: Duration) -> Result<DefaultMetrics> {
    let process = Arc::new(ProcessCollector::new());
    let scheduler_lag = Arc::new(Gauge::new(
        "tokio_scheduler_lag_seconds",
        "Time a yielded task waited to be polled again, in seconds.",
    )?);
    let workers = Arc::new(Gauge::new("tokio_workers_count", "Number of runtime worker threads.")?);
    let alive_tasks = Arc::new(Gauge::new("tokio_alive_tasks", "Number of alive tasks in the runtime.")?);

    registry.register(process.clone())?;
    registry.register(scheduler_lag.clone())?;
    registry.register(workers.clone())?;
    registry.register(alive_tasks.clone())?;

    Ok(DefaultMetrics { process, scheduler_lag, workers, alive_tasks, interval })
}
