/// Point-in-time view of a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Live workers, as last published by the scaler.
    pub workers: usize,
    pub peak_workers: usize,
    pub queued_jobs: usize,
    /// Jobs submitted but not yet fully processed.
    pub in_flight: usize,
    pub submitted: usize,
    pub completed: usize,
    /// Jobs whose processing panicked.
    pub failed: usize,
}

impl PoolMetrics {
    pub fn success_rate(&self) -> f64 {
        let total = self.completed + self.failed;
        if total == 0 {
            return 1.0;
        }
        self.completed as f64 / total as f64
    }

    /// Queued jobs per live worker; the raw backlog when no worker is up yet.
    pub fn queue_pressure(&self) -> f64 {
        if self.workers == 0 {
            return self.queued_jobs as f64;
        }
        self.queued_jobs as f64 / self.workers as f64
    }
}
