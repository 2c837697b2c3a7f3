use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Rejection raised by [`PoolConfig::validate`](crate::config::PoolConfig::validate)
/// when a pool is built with parameters that break its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `min_workers` must be at least 1 and strictly below `max_workers`.
    #[error("invalid worker bounds: min={min}, max={max} (need min >= 1 and max > min)")]
    InvalidWorkerBounds { min: usize, max: usize },

    #[error("invalid queue size {0}: capacity must be at least 100")]
    InvalidQueueSize(usize),

    /// Scale point must lie in `10..=queue_capacity / 2`.
    #[error("invalid scale point {scale_point}: must be between 10 and {max}")]
    InvalidScalePoint { scale_point: usize, max: usize },

    #[error("invalid scale cycle {0:?}: must be at least 5s")]
    InvalidCycle(Duration),

    #[error("invalid result capacity {0}: must be at least 1")]
    InvalidResultCapacity(usize),
}

impl ConfigError {
    /// Stable kebab-case name of the violated constraint.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::InvalidWorkerBounds { .. } => "invalid-worker-bounds",
            ConfigError::InvalidQueueSize(_) => "invalid-queue-size",
            ConfigError::InvalidScalePoint { .. } => "invalid-scale-point",
            ConfigError::InvalidCycle(_) => "invalid-cycle",
            ConfigError::InvalidResultCapacity(_) => "invalid-result-capacity",
        }
    }
}

/// A job the pool refused. The job is handed back to the caller.
#[derive(PartialEq, Eq, Clone, Error)]
pub enum SubmitError<T> {
    /// The job buffer has no free slot (only returned by `try_submit`).
    #[error("job queue is full")]
    Full(T),
    /// The pool has been stopped.
    #[error("pool is stopped")]
    Closed(T),
}

impl<T> SubmitError<T> {
    pub fn into_inner(self) -> T {
        match self {
            SubmitError::Full(job) | SubmitError::Closed(job) => job,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SubmitError::Closed(_))
    }
}

impl<T> fmt::Debug for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Full(_) => f.write_str("Full(..)"),
            SubmitError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}
