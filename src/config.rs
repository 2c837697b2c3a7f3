use std::time::Duration;

use crate::errors::ConfigError;

pub const MIN_QUEUE_CAPACITY: usize = 100;
pub const MIN_SCALE_POINT: usize = 10;
pub const MIN_SCALE_CYCLE: Duration = Duration::from_secs(5);

/// Конфигурация пула
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Interval between two scaler evaluations.
    pub scale_cycle: Duration,
    pub min_workers: usize,
    pub max_workers: usize,
    /// Capacity of the job buffer; submission suspends once it is full.
    pub queue_capacity: usize,
    /// Queue depth that justifies one worker (`demand = queued / scale_point`).
    pub scale_point: usize,
    pub collect_results: bool,
    /// Result buffer capacity. `None` means twice the queue capacity.
    pub result_capacity: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            scale_cycle: MIN_SCALE_CYCLE,
            min_workers: 1,
            max_workers: (num_cpus::get() * 2).max(2),
            queue_capacity: 1_000,
            scale_point: 50,
            collect_results: false,
            result_capacity: None,
        }
    }
}

impl PoolConfig {
    /// Для CPU-bound задач: воркеров не больше, чем ядер
    pub fn cpu_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            max_workers: num_cpus.max(2),
            queue_capacity: (num_cpus * 100).max(MIN_QUEUE_CAPACITY),
            scale_point: MIN_SCALE_POINT,
            ..Default::default()
        }
    }

    /// Для I/O-bound задач: воркеры в основном ждут, поэтому их можно больше
    pub fn io_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            min_workers: 2,
            max_workers: (num_cpus * 8).max(3),
            queue_capacity: (num_cpus * 500).max(MIN_QUEUE_CAPACITY),
            scale_point: 25,
            ..Default::default()
        }
    }

    pub fn with_results(mut self, result_capacity: Option<usize>) -> Self {
        self.collect_results = true;
        self.result_capacity = result_capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_workers < 1 || self.max_workers <= self.min_workers {
            return Err(ConfigError::InvalidWorkerBounds {
                min: self.min_workers,
                max: self.max_workers,
            });
        }
        if self.queue_capacity < MIN_QUEUE_CAPACITY {
            return Err(ConfigError::InvalidQueueSize(self.queue_capacity));
        }
        let max_scale_point = self.queue_capacity / 2;
        if self.scale_point < MIN_SCALE_POINT || self.scale_point > max_scale_point {
            return Err(ConfigError::InvalidScalePoint {
                scale_point: self.scale_point,
                max: max_scale_point,
            });
        }
        if self.scale_cycle < MIN_SCALE_CYCLE {
            return Err(ConfigError::InvalidCycle(self.scale_cycle));
        }
        if self.collect_results && self.result_capacity == Some(0) {
            return Err(ConfigError::InvalidResultCapacity(0));
        }
        Ok(())
    }

    pub(crate) fn effective_result_capacity(&self) -> usize {
        self.result_capacity.unwrap_or(self.queue_capacity * 2)
    }
}
