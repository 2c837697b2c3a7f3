use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::{atomic::Ordering, Arc},
};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use super::pool::Shared;

/// Цикл воркера: забирает задачи, пока не отменен его токен
///
/// Отмена проверяется только между задачами, взятая задача всегда
/// доводится до конца. `pop` очереди cancel safe, поэтому проигранная гонка
/// с токеном не теряет задачу.
pub(crate) async fn run<J, R>(
    shared: Arc<Shared<J, R>>,
    ordinal: usize,
    cancel_token: CancellationToken,
)
where
    J: Send + 'static,
    R: Send + 'static,
{
    info!(worker = ordinal, "worker started");
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            job = shared.jobs.pop() => match job {
                Some(job) => job,
                None => break,
            },
        };
        process(&shared, ordinal, job).await;
    }
    info!(worker = ordinal, "worker stopped");
}

async fn process<J, R>(shared: &Shared<J, R>, ordinal: usize, job: J)
where
    J: Send + 'static,
    R: Send + 'static,
{
    let span = tracing::info_span!("job", request_id = %Uuid::new_v4(), worker = ordinal);
    let handler = shared.process.clone();
    let outcome = AssertUnwindSafe(async move { handler(job).await })
        .catch_unwind()
        .instrument(span.clone())
        .await;

    match outcome {
        Ok(output) => {
            if let Some(results) = &shared.results {
                // Ошибка только после закрытия пула, читать результат уже некому.
                let _ = results.push(output).await;
            }
            shared.completed.fetch_add(1, Ordering::Relaxed);
        }
        Err(panic) => {
            shared.failed.fetch_add(1, Ordering::Relaxed);
            span.in_scope(|| {
                error!(panic = %panic_message(panic.as_ref()), "job panicked");
            });
        }
    }

    shared.finish_job();
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
