use std::sync::Arc;

use futures::Stream;
use tokio_util::sync::CancellationToken;

use super::queue::BoundedQueue;

/// Cancellation handle of one worker, owned by the scaler's LIFO stack.
#[derive(Debug)]
pub struct WorkerHandle {
    ordinal: usize,
    cancel_token: CancellationToken,
}

impl WorkerHandle {
    pub fn new(ordinal: usize, cancel_token: CancellationToken) -> Self {
        Self {
            ordinal,
            cancel_token,
        }
    }

    #[inline]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Asks the worker to stop after its current job, if any.
    #[inline]
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// Consumer side of the result buffer.
///
/// Outputs arrive in completion order, not submission order. The stream ends
/// once the pool has been stopped and every buffered output was taken.
pub struct ResultStream<R> {
    queue: Arc<BoundedQueue<R>>,
}

impl<R> Clone for ResultStream<R> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<R> ResultStream<R> {
    pub(crate) fn new(queue: Arc<BoundedQueue<R>>) -> Self {
        Self { queue }
    }

    /// Next output; `None` after shutdown once the buffer is drained.
    pub async fn recv(&self) -> Option<R> {
        self.queue.pop().await
    }

    pub fn try_recv(&self) -> Option<R> {
        self.queue.try_pop()
    }

    /// Outputs currently buffered.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn into_stream(self) -> impl Stream<Item = R> {
        futures::stream::unfold(self.queue, |queue| async move {
            let item = queue.pop().await?;
            Some((item, queue))
        })
    }
}
