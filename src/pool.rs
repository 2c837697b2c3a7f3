use super::{
    config::PoolConfig,
    errors::{ConfigError, SubmitError},
    handle::ResultStream,
    model::PoolMetrics,
    queue::BoundedQueue,
    scaler::{Scaler, ScalingPolicy},
};
use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::Notify;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{info, warn};

pub(crate) type ProcessFn<J, R> = Arc<dyn Fn(J) -> BoxFuture<'static, R> + Send + Sync>;

/// Общее состояние фасада, scaler-а и всех воркеров
pub(crate) struct Shared<J, R> {
    pub(crate) jobs: BoundedQueue<J>,
    pub(crate) results: Option<Arc<BoundedQueue<R>>>,
    pub(crate) process: ProcessFn<J, R>,
    in_flight: AtomicUsize,
    drained: Notify,
    /// Пишет только scaler
    pub(crate) workers: AtomicUsize,
    pub(crate) peak_workers: AtomicUsize,
    submitted: AtomicUsize,
    pub(crate) completed: AtomicUsize,
    pub(crate) failed: AtomicUsize,
}

impl<J, R> Shared<J, R> {
    pub(crate) fn new(
        queue_capacity: usize,
        result_capacity: Option<usize>,
        process: ProcessFn<J, R>,
    ) -> Self {
        Self {
            jobs: BoundedQueue::new(queue_capacity),
            results: result_capacity.map(|capacity| Arc::new(BoundedQueue::new(capacity))),
            process,
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
            workers: AtomicUsize::new(0),
            peak_workers: AtomicUsize::new(0),
            submitted: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Задача обработана полностью (или брошена до постановки в очередь)
    pub(crate) fn finish_job(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }

    async fn wait_drained(&self) {
        loop {
            // Регистрируемся до проверки, иначе параллельный дренаж можно пропустить.
            let notified = self.drained.notified();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn close_buffers(&self) {
        self.jobs.close();
        if let Some(results) = &self.results {
            results.close();
        }
    }

    fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            workers: self.workers.load(Ordering::Acquire),
            peak_workers: self.peak_workers.load(Ordering::Relaxed),
            queued_jobs: self.jobs.len(),
            in_flight: self.in_flight.load(Ordering::Acquire),
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Counts a submission as in flight until it is committed to the queue.
/// Dropping it first (refused job, cancelled `submit`) undoes the count.
struct InFlightGuard<'a, J, R> {
    shared: &'a Shared<J, R>,
    committed: bool,
}

impl<'a, J, R> InFlightGuard<'a, J, R> {
    fn new(shared: &'a Shared<J, R>) -> Self {
        shared.in_flight.fetch_add(1, Ordering::AcqRel);
        Self {
            shared,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
    }
}

impl<J, R> Drop for InFlightGuard<'_, J, R> {
    fn drop(&mut self) {
        if !self.committed {
            self.shared.finish_job();
        }
    }
}

struct PoolInner<J, R> {
    shared: Arc<Shared<J, R>>,
    config: PoolConfig,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    stopping: AtomicBool,
}

impl<J, R> Drop for PoolInner<J, R> {
    fn drop(&mut self) {
        // Последний handle ушёл без `stop`: гасим фоновые задачи.
        let in_flight = self.shared.in_flight.load(Ordering::Acquire);
        if in_flight > 0 {
            warn!(
                in_flight,
                queue_len = self.shared.jobs.len(),
                "pool dropped without stop, pending jobs discarded"
            );
        }
        self.shutdown.cancel();
        self.shared.close_buffers();
    }
}

/// Ограниченная очередь задач с самомасштабируемым набором async воркеров
///
/// Clone дает еще один handle на тот же пул. Воркеры запускает и
/// останавливает только внутренний scaler: раз в `scale_cycle` он смотрит на
/// глубину очереди и меняет число воркеров не больше чем на один, в пределах
/// `min_workers..=max_workers`.
pub struct ScalingPool<J, R = ()> {
    inner: Arc<PoolInner<J, R>>,
}

impl<J, R> Clone for ScalingPool<J, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<J, R> ScalingPool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    /// Positional constructor mirroring [`PoolConfig`]'s fields.
    ///
    /// # Panics
    /// Outside of a tokio runtime.
    pub fn new<F, Fut>(
        scale_cycle: Duration,
        min_workers: usize,
        max_workers: usize,
        queue_capacity: usize,
        scale_point: usize,
        process: F,
        collect_results: bool,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let config = PoolConfig {
            scale_cycle,
            min_workers,
            max_workers,
            queue_capacity,
            scale_point,
            collect_results,
            result_capacity: None,
        };
        Self::with_config(config, process)
    }

    /// Validates `config` and starts the scaler. No worker exists until the
    /// first evaluation, one `scale_cycle` from now.
    ///
    /// # Panics
    /// Outside of a tokio runtime.
    pub fn with_config<F, Fut>(config: PoolConfig, process: F) -> Result<Self, ConfigError>
    where
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        config.validate()?;

        let process: ProcessFn<J, R> = Arc::new(move |job: J| process(job).boxed());
        let result_capacity = config
            .collect_results
            .then(|| config.effective_result_capacity());
        let shared = Arc::new(Shared::new(config.queue_capacity, result_capacity, process));

        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        let scaler = Scaler::new(
            shared.clone(),
            ScalingPolicy::from(&config),
            config.scale_cycle,
            tracker.clone(),
            shutdown.clone(),
        );
        tracker.spawn(scaler.run());

        info!(
            min_workers = config.min_workers,
            max_workers = config.max_workers,
            queue_capacity = config.queue_capacity,
            scale_point = config.scale_point,
            collect_results = config.collect_results,
            "pool started"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                shared,
                config,
                shutdown,
                tracker,
                stopping: AtomicBool::new(false),
            }),
        })
    }

    /// Enqueues a job, suspending while the queue is full.
    ///
    /// The job counts as in flight from before it becomes visible to workers
    /// until its processing ends. Fails only once the pool is stopping, with
    /// the job handed back.
    pub async fn submit(&self, job: J) -> Result<(), SubmitError<J>> {
        if self.is_stopped() {
            return Err(SubmitError::Closed(job));
        }
        let guard = InFlightGuard::new(&self.inner.shared);
        match self.inner.shared.jobs.push(job).await {
            Ok(()) => {
                guard.commit();
                Ok(())
            }
            Err(job) => Err(SubmitError::Closed(job)),
        }
    }

    /// Non-suspending [`submit`](Self::submit).
    pub fn try_submit(&self, job: J) -> Result<(), SubmitError<J>> {
        if self.is_stopped() {
            return Err(SubmitError::Closed(job));
        }
        let guard = InFlightGuard::new(&self.inner.shared);
        match self.inner.shared.jobs.try_push(job) {
            Ok(()) => {
                guard.commit();
                Ok(())
            }
            Err((job, true)) => Err(SubmitError::Closed(job)),
            Err((job, false)) => Err(SubmitError::Full(job)),
        }
    }

    /// Advisory headroom check: `queued + workers < queue_capacity`.
    /// May be stale by the time a submission follows.
    #[inline]
    pub fn has_capacity(&self) -> bool {
        self.queue_len() + self.current_workers() < self.inner.config.queue_capacity
    }

    /// Ждет обработки всех принятых задач, затем отменяет scaler и всех
    /// воркеров, дожидается их выхода и закрывает буферы задач и результатов.
    ///
    /// Терминальная операция. Повторный (в том числе параллельный) вызов
    /// ничего не делает и возвращается, когда пул уже неактивен.
    /// ВАЖНО: если результаты собираются, читайте их параллельно. Полный
    /// буфер результатов держит воркеров, а вместе с ними и этот вызов.
    pub async fn stop(&self) {
        let inner = &self.inner;
        let first = !inner.stopping.swap(true, Ordering::AcqRel);
        if first {
            info!(in_flight = inner.shared.in_flight.load(Ordering::Acquire), "stopping pool");
        }

        inner.shared.wait_drained().await;
        inner.shutdown.cancel();
        inner.tracker.close();
        inner.tracker.wait().await;
        inner.shared.close_buffers();

        if first {
            let metrics = inner.shared.metrics();
            info!(
                submitted = metrics.submitted,
                completed = metrics.completed,
                failed = metrics.failed,
                peak_workers = metrics.peak_workers,
                "pool stopped"
            );
        }
    }

    /// Consumer side of the result buffer; `None` unless results are collected.
    pub fn results(&self) -> Option<ResultStream<R>> {
        self.inner.shared.results.clone().map(ResultStream::new)
    }

    #[inline]
    pub fn current_workers(&self) -> usize {
        self.inner.shared.workers.load(Ordering::Acquire)
    }

    #[inline]
    pub fn queue_len(&self) -> usize {
        self.inner.shared.jobs.len()
    }

    #[inline]
    pub fn in_flight(&self) -> usize {
        self.inner.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopping.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        self.inner.shared.metrics()
    }

    /// Мониторинг метрик с callback
    ///
    /// Работает, пока не отменен возвращенный токен или не остановлен пул.
    /// Мониторинг не удерживает пул живым.
    pub fn start_monitoring<F>(&self, interval: Duration, callback: F) -> CancellationToken
    where
        F: Fn(PoolMetrics) + Send + 'static,
    {
        let shared = Arc::clone(&self.inner.shared);
        let token = self.inner.shutdown.child_token();
        let token_clone = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => callback(shared.metrics()),
                    _ = token_clone.cancelled() => break,
                }
            }
        });

        token
    }
}
