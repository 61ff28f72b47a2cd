use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Bounded single-producer/single-consumer frame queue between a capture
/// thread and the processing thread.
///
/// The producer side never blocks: a full queue rejects the incoming
/// frame and counts it, so the native audio callback is never stalled.
/// The consumer may wait with a bounded timeout for data to arrive.
#[derive(Debug)]
pub struct FrameQueue<T> {
    inner: Mutex<VecDeque<T>>,
    data_ready: Condvar,
    capacity: usize,
    dropped: AtomicU64,
}

impl<T> FrameQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            data_ready: Condvar::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue a frame. Returns `false` (and counts a drop) when the
    /// queue is at capacity. Never blocks.
    pub fn push(&self, item: T) -> bool {
        let mut q = self.inner.lock();
        if q.len() >= self.capacity {
            drop(q);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        q.push_back(item);
        drop(q);
        self.data_ready.notify_one();
        true
    }

    /// Dequeue the oldest frame, if any. Never blocks.
    pub fn pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Drain every queued frame in order.
    pub fn drain(&self) -> Vec<T> {
        self.inner.lock().drain(..).collect()
    }

    /// Wait until the queue is non-empty or `timeout` elapses.
    /// Returns `true` when data is available.
    pub fn wait_nonempty(&self, timeout: Duration) -> bool {
        let mut q = self.inner.lock();
        if !q.is_empty() {
            return true;
        }
        self.data_ready.wait_for(&mut q, timeout);
        !q.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Total frames rejected at the producer side since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
