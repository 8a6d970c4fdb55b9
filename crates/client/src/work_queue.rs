use eyeball::{SharedObservable, Subscriber};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Single-flight FIFO for the round trips of one object.
///
/// Work is an unpolled future, so everything it captures at construction time
/// is taken when it is enqueued, while everything it reads inside its body is
/// read only once every earlier item has finished. Refresh backups rely on the
/// latter.
#[derive(Debug)]
pub struct WorkQueue {
    // tokio's mutex hands out the lock in acquisition order
    slot: Mutex<()>,
    pending: AtomicUsize,
    is_busy: SharedObservable<bool>,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(()),
            pending: AtomicUsize::new(0),
            is_busy: SharedObservable::new(false),
        }
    }

    /// Wait for every earlier item, then run `work` to completion
    pub async fn run<F, T>(&self, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let _pending = PendingGuard::enter(self);
        let _slot = self.slot.lock().await;
        work.await
    }

    pub fn is_busy(&self) -> bool {
        self.is_busy.get()
    }

    pub fn subscribe_busy(&self) -> Subscriber<bool> {
        self.is_busy.subscribe()
    }

    /// Number of items queued or running
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Keeps the busy flag in sync even when a queued future is dropped early
struct PendingGuard<'a> {
    queue: &'a WorkQueue,
}

impl<'a> PendingGuard<'a> {
    fn enter(queue: &'a WorkQueue) -> Self {
        if queue.pending.fetch_add(1, Ordering::SeqCst) == 0 {
            queue.is_busy.set_if_not_eq(true);
        }
        Self { queue }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.queue.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.queue.is_busy.set_if_not_eq(false);
        }
    }
}
