//! Shared error type across tally crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, TallyError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum TallyError {
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("invalid metric: {0}")]
    InvalidMetric(String),
    #[error("duplicate metric: {0}")]
    DuplicateMetric(String),
    /// Failure reported by the simulated heavy task. Never shown to clients.
    #[error("heavy task failed: {0}")]
    HeavyTask(String),
    #[error("log shipping failed: {0}")]
    LogShipping(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl TallyError {
    /// Stable short tag, used in log fields and test assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            TallyError::BadConfig(_) => "BAD_CONFIG",
            TallyError::InvalidMetric(_) => "INVALID_METRIC",
            TallyError::DuplicateMetric(_) => "DUPLICATE_METRIC",
            TallyError::HeavyTask(_) => "HEAVY_TASK",
            TallyError::LogShipping(_) => "LOG_SHIPPING",
            TallyError::Io(_) => "IO",
            TallyError::Internal(_) => "INTERNAL",
        }
    }
}
