use scaling_pool::{PoolConfig, ScalingPool};
use std::time::{Duration, Instant};
use tokio::runtime::Builder;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scaling_pool=info")),
        )
        .init();

    let rt = Builder::new_multi_thread().enable_all().build()?;

    rt.block_on(async {
        let now = Instant::now();
        let config = PoolConfig {
            scale_cycle: Duration::from_secs(5),
            min_workers: 2,
            max_workers: 10,
            queue_capacity: 200,
            scale_point: 20,
            ..Default::default()
        }
        .with_results(None);

        let pool = ScalingPool::with_config(config, |x: u64| async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            x * 2
        })?;

        let monitor = pool.start_monitoring(Duration::from_secs(5), |metrics| {
            tracing::info!(
                workers = metrics.workers,
                queued = metrics.queued_jobs,
                in_flight = metrics.in_flight,
                completed = metrics.completed,
                "pool metrics"
            );
        });

        let collector = pool.results().map(|results| {
            tokio::spawn(async move {
                let mut sum = 0;
                while let Some(value) = results.recv().await {
                    sum += value;
                }
                sum
            })
        });

        for i in 0..150 {
            if pool.submit(i).await.is_err() {
                break;
            }
        }
        pool.stop().await;
        monitor.cancel();

        if let Some(collector) = collector {
            let sum = collector.await?;
            println!("sum of doubled jobs: {}", sum);
        }
        println!("metrics: {:?}", pool.metrics());
        println!("elapsed: {:?}", now.elapsed());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
