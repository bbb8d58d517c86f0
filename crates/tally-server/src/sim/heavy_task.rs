//! Artificial "heavy task" used by `/slow`.
//!
//! The pause is a `tokio::time::sleep`, so only the calling task is
//! suspended; other requests keep being served on the same runtime.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::time::{Duration, Instant};

use tally_core::error::{Result, TallyError};

use crate::config::HeavyTaskConfig;

/// Failure messages a simulated run can report.
pub const FAILURE_MESSAGES: [&str; 4] = [
    "DB Payment Failure",
    "DB Server is Down",
    "Access Denied",
    "Not Found Error",
];

/// A unit of slow work. Returns the elapsed time in milliseconds.
#[async_trait]
pub trait HeavyTask: Send + Sync + 'static {
    async fn run(&self) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct SimulatedHeavyTask {
    delays_ms: Vec<u64>,
    failure_one_in: u32,
}

impl SimulatedHeavyTask {
    pub fn new(cfg: &HeavyTaskConfig) -> Self {
        Self {
            delays_ms: cfg.delays_ms.clone(),
            failure_one_in: cfg.failure_one_in,
        }
    }

    /// Pick the pause and decide on failure up front, so no RNG is held
    /// across the await.
    fn plan(&self) -> std::result::Result<u64, &'static str> {
        let mut rng = rand::thread_rng();
        if self.failure_one_in > 0 && rng.gen_range(0..self.failure_one_in) == 0 {
            let msg = FAILURE_MESSAGES.choose(&mut rng).copied().unwrap_or(FAILURE_MESSAGES[0]);
            return Err(msg);
        }
        Ok(self.delays_ms.choose(&mut rng).copied().unwrap_or_default())
    }
}

#[async_trait]
impl HeavyTask for SimulatedHeavyTask {
    async fn run(&self) -> Result<u64> {
        let delay_ms = self
            .plan()
            .map_err(|msg| TallyError::HeavyTask(msg.to_string()))?;

        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        let elapsed = started.elapsed().as_millis();

        tracing::debug!(delay_ms, elapsed_ms = %elapsed, "heavy task finished");
        Ok(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }
}
