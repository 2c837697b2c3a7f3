//! Periodic control loop sizing the worker set from queue depth.
//!
//! The scaler task is the only owner of the worker topology: it spawns
//! workers, keeps their cancellation handles on a LIFO stack and publishes
//! the live count through [`Shared::workers`] for everyone else to read.

use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info};

use super::{config::PoolConfig, handle::WorkerHandle, pool::Shared, worker};

/// Pure scaling rules, evaluated against a live queue depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingPolicy {
    pub min_workers: usize,
    pub max_workers: usize,
    pub scale_point: usize,
}

impl From<&PoolConfig> for ScalingPolicy {
    fn from(config: &PoolConfig) -> Self {
        Self {
            min_workers: config.min_workers,
            max_workers: config.max_workers,
            scale_point: config.scale_point,
        }
    }
}

impl ScalingPolicy {
    /// Workers the current backlog asks for.
    #[inline]
    pub fn demand(&self, queued: usize) -> usize {
        queued / self.scale_point
    }

    /// Demand-driven growth. A demand at or above `max_workers` does not grow
    /// the pool.
    pub fn should_grow(&self, queued: usize, workers: usize) -> bool {
        let demand = self.demand(queued);
        demand < self.max_workers && demand > workers && workers < self.max_workers
    }

    pub fn should_shrink(&self, queued: usize, workers: usize) -> bool {
        self.demand(queued) < workers && workers > self.min_workers
    }
}

pub(crate) struct Scaler<J, R> {
    shared: Arc<Shared<J, R>>,
    policy: ScalingPolicy,
    cycle: Duration,
    /// Stack of live workers; the top is the most recently started one.
    workers: Vec<WorkerHandle>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl<J, R> Scaler<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(
        shared: Arc<Shared<J, R>>,
        policy: ScalingPolicy,
        cycle: Duration,
        tracker: TaskTracker,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            shared,
            policy,
            cycle,
            workers: Vec::with_capacity(policy.max_workers),
            tracker,
            shutdown,
        }
    }

    /// Ticks every cycle until the shutdown token fires, then cancels every
    /// worker still alive.
    pub(crate) async fn run(mut self) {
        info!(
            cycle = ?self.cycle,
            min_workers = self.policy.min_workers,
            max_workers = self.policy.max_workers,
            scale_point = self.policy.scale_point,
            "scaler started"
        );
        // Первая оценка через полный цикл после старта
        let mut ticker = time::interval_at(Instant::now() + self.cycle, self.cycle);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.tick(),
            }
        }

        self.retire_all();
        info!("scaler stopped");
    }

    /// One evaluation: growth first, then shrink, each reading the queue anew.
    pub(crate) fn tick(&mut self) {
        self.scale_up();
        self.scale_down();
    }

    fn scale_up(&mut self) {
        let queued = self.shared.jobs.len();
        let current = self.workers.len();

        if current < self.policy.min_workers {
            while self.workers.len() < self.policy.min_workers {
                self.spawn_worker();
            }
            info!(workers = self.workers.len(), queued, "scaled up to minimum");
            return;
        }

        let demand = self.policy.demand(queued);
        if self.policy.should_grow(queued, current) {
            let ordinal = self.spawn_worker();
            info!(worker = ordinal, workers = self.workers.len(), queued, demand, "scaled up");
        } else {
            debug!(workers = current, queued, demand, "no scale up");
        }
    }

    fn scale_down(&mut self) {
        let queued = self.shared.jobs.len();
        if !self.policy.should_shrink(queued, self.workers.len()) {
            return;
        }
        if let Some(handle) = self.workers.pop() {
            handle.cancel();
            self.publish();
            info!(
                worker = handle.ordinal(),
                workers = self.workers.len(),
                queued,
                demand = self.policy.demand(queued),
                "scaled down"
            );
        }
    }

    fn spawn_worker(&mut self) -> usize {
        let ordinal = self.workers.len() + 1;
        let cancel_token = self.shutdown.child_token();
        self.tracker
            .spawn(worker::run(self.shared.clone(), ordinal, cancel_token.clone()));
        self.workers.push(WorkerHandle::new(ordinal, cancel_token));
        self.publish();
        ordinal
    }

    fn retire_all(&mut self) {
        while let Some(handle) = self.workers.pop() {
            handle.cancel();
        }
        self.publish();
    }

    fn publish(&self) {
        let count = self.workers.len();
        self.shared.workers.store(count, Ordering::Release);
        self.shared.peak_workers.fetch_max(count, Ordering::Relaxed);
    }
}
