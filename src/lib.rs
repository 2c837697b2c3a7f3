//! Самомасштабируемый async пул воркеров поверх ограниченной очереди задач
//!
//! # Features
//! - Ограниченная FIFO очередь задач с backpressure на submit
//! - Периодический scaler: плюс или минус один воркер за цикл
//! - LIFO остановка воркеров через персональные cancellation токены
//! - Опциональный ограниченный поток результатов
//! - Graceful shutdown: сначала дренаж, потом остановка
//! - Изоляция паник на уровне задачи и `tracing` спаны с request id

pub mod config;
pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod queue;
pub mod scaler;
mod worker;

pub use config::PoolConfig;
pub use errors::{ConfigError, SubmitError};
pub use handle::ResultStream;
pub use model::PoolMetrics;
pub use pool::ScalingPool;
pub use scaler::ScalingPolicy;
