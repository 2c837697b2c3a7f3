//! Bounded async FIFO used for both the job buffer and the result buffer.
//!
//! Storage is a lock-free [`ArrayQueue`]; two semaphores count free slots and
//! ready items so producers and consumers suspend instead of spinning.
//! Items are only made visible (an `items` permit is added) after they are in
//! the ring, so a consumer holding an `items` permit always finds one.

use crossbeam::queue::ArrayQueue;
use tokio::sync::{Semaphore, TryAcquireError};

pub struct BoundedQueue<T> {
    buf: ArrayQueue<T>,
    slots: Semaphore,
    items: Semaphore,
}

impl<T> BoundedQueue<T> {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: ArrayQueue::new(capacity),
            slots: Semaphore::new(capacity),
            items: Semaphore::new(0),
        }
    }

    /// Waits for a free slot, then enqueues. Hands the item back if the queue is closed.
    pub async fn push(&self, item: T) -> Result<(), T> {
        match self.slots.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => return Err(item),
        }
        self.commit(item)
    }

    /// `Err((item, true))` when closed, `Err((item, false))` when full.
    pub fn try_push(&self, item: T) -> Result<(), (T, bool)> {
        match self.slots.try_acquire() {
            Ok(permit) => permit.forget(),
            Err(TryAcquireError::Closed) => return Err((item, true)),
            Err(TryAcquireError::NoPermits) => return Err((item, false)),
        }
        self.commit(item).map_err(|item| (item, false))
    }

    fn commit(&self, item: T) -> Result<(), T> {
        // Зарезервированный слот гарантирует место в кольце
        if let Err(item) = self.buf.push(item) {
            self.slots.add_permits(1);
            return Err(item);
        }
        self.items.add_permits(1);
        Ok(())
    }

    /// Waits for the next item. After [`close`](Self::close) the remaining
    /// items are still handed out; `None` means closed and drained.
    ///
    /// Cancel safe: dropping the future before it resolves loses no item.
    pub async fn pop(&self) -> Option<T> {
        match self.items.acquire().await {
            Ok(permit) => {
                permit.forget();
                self.take()
            }
            Err(_) => self.buf.pop(),
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        match self.items.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.take()
            }
            Err(TryAcquireError::Closed) => self.buf.pop(),
            Err(TryAcquireError::NoPermits) => None,
        }
    }

    fn take(&self) -> Option<T> {
        let item = self.buf.pop();
        if item.is_some() {
            self.slots.add_permits(1);
        }
        item
    }

    /// Rejects further pushes and wakes every waiter.
    pub fn close(&self) {
        self.slots.close();
        self.items.close();
    }

    pub fn is_closed(&self) -> bool {
        self.items.is_closed()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}
