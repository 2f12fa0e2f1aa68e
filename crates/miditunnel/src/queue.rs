//! Thread-safe FIFO byte buffer between the delivery thread and readers.
//!
//! The queue is the only shared mutable state between the transport's
//! delivery path (single producer) and reader tasks. Appends come from a
//! plain thread the crate does not control, so the interior lock is a
//! `std::sync::Mutex` held only for short, non-async critical sections;
//! waiting readers park on a `tokio::sync::Notify` instead of blocking a
//! thread.
//!
//! The queue is unbounded: no backpressure is signalled to the producer,
//! and a reader that falls behind lets the queue grow without limit. Flow
//! control is an explicit non-goal of this layer.

use std::collections::VecDeque;
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::Notify;

/// Error type for queue read operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was closed while (or before) a read was waiting.
    #[error("byte queue closed")]
    Closed,
}

#[derive(Debug, Default)]
struct QueueState {
    buf: VecDeque<u8>,
    closed: bool,
}

/// An unbounded FIFO of pending bytes with cooperative blocking reads.
///
/// One instance exists per tunnel endpoint; the decoder appends and the
/// endpoint's read operations drain. Length checks and drains happen under
/// a single lock acquisition, so a reader never removes fewer bytes than
/// its length check observed.
#[derive(Debug, Default)]
pub struct ByteQueue {
    state: Mutex<QueueState>,
    readable: Notify,
}

impl ByteQueue {
    /// Creates a new, empty, open queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes to the tail and wakes waiting readers.
    ///
    /// Never blocks beyond the short internal lock, so it is safe to call
    /// from the transport's delivery thread. Appending to a closed queue is
    /// a no-op: the bytes are dropped.
    pub fn append(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return;
            }
            state.buf.extend(bytes.iter().copied());
        }
        self.readable.notify_waiters();
    }

    /// Drains and returns everything currently queued, possibly nothing.
    ///
    /// Never blocks and never errors; after [`close`](Self::close) it still
    /// drains whatever residue was queued at close time.
    pub fn take_available(&self) -> Vec<u8> {
        let mut state = self.state.lock().unwrap();
        state.buf.drain(..).collect()
    }

    /// Waits until at least `n` bytes are queued, then atomically removes
    /// and returns exactly the first `n` in FIFO order.
    ///
    /// The wait is cooperative: the task is parked on a notifier rather
    /// than spinning or blocking a thread, so delivery callbacks and
    /// waiting readers can interleave even on a single-threaded runtime.
    /// The queue length is re-checked on every wakeup, since wakeups may be
    /// coalesced with partial arrivals.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the queue is closed before or
    /// while the wait is pending.
    pub async fn take_exactly(&self, n: usize) -> Result<Vec<u8>, QueueError> {
        let notified = self.readable.notified();
        tokio::pin!(notified);
        loop {
            // Register for a wakeup before checking the state, so an append
            // racing with the check cannot be missed.
            notified.as_mut().enable();
            {
                let mut state = self.state.lock().unwrap();
                if state.closed {
                    return Err(QueueError::Closed);
                }
                if state.buf.len() >= n {
                    return Ok(state.buf.drain(..n).collect());
                }
            }
            notified.as_mut().await;
            notified.set(self.readable.notified());
        }
    }

    /// Closes the queue, waking every pending [`take_exactly`](Self::take_exactly)
    /// with [`QueueError::Closed`]. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        self.readable.notify_waiters();
    }

    /// Number of bytes currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().buf.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready, assert_ready_eq};

    #[test]
    fn test_new_queue_is_empty_and_open() {
        let queue = ByteQueue::new();
        assert!(queue.is_empty());
        assert!(!queue.is_closed());
    }

    #[test]
    fn test_take_available_on_empty_queue_returns_empty() {
        let queue = ByteQueue::new();
        assert!(queue.take_available().is_empty());
    }

    #[test]
    fn test_take_available_drains_everything_in_order() {
        let queue = ByteQueue::new();
        queue.append(&[1, 2, 3]);
        queue.append(&[4]);

        assert_eq!(queue.take_available(), vec![1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_append_to_closed_queue_is_dropped() {
        let queue = ByteQueue::new();
        queue.close();
        queue.append(&[1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_take_exactly_returns_immediately_when_enough_queued() {
        let queue = ByteQueue::new();
        queue.append(&[1, 2, 3, 4, 5]);

        let bytes = queue.take_exactly(3).await.unwrap();

        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(queue.len(), 2, "surplus must stay queued");
    }

    #[tokio::test]
    async fn test_take_exactly_waits_until_enough_bytes_arrive() {
        let queue = Arc::new(ByteQueue::new());
        queue.append(&[1, 2]);

        // A read for 5 bytes with only 2 queued must stay pending.
        let mut read = tokio_test::task::spawn(queue.take_exactly(5));
        assert_pending!(read.poll());

        // 2 + 2 = 4 bytes: still not enough.
        queue.append(&[3, 4]);
        assert!(read.is_woken());
        assert_pending!(read.poll());

        // The fifth byte arrives; the read completes with exactly 5 bytes
        // and the surplus stays queued.
        queue.append(&[5, 6]);
        assert_ready_eq!(read.poll(), Ok(vec![1, 2, 3, 4, 5]));
        drop(read);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_take_exactly_zero_completes_on_empty_queue() {
        let queue = ByteQueue::new();
        assert_eq!(queue.take_exactly(0).await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn test_close_cancels_pending_take_exactly() {
        let queue = Arc::new(ByteQueue::new());

        let mut read = tokio_test::task::spawn(queue.take_exactly(1));
        assert_pending!(read.poll());

        queue.close();
        assert!(read.is_woken());
        assert_ready_eq!(read.poll(), Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn test_take_exactly_on_closed_queue_fails_immediately() {
        let queue = ByteQueue::new();
        queue.close();
        assert_eq!(queue.take_exactly(1).await, Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let queue = ByteQueue::new();
        queue.close();
        queue.close();
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn test_append_from_foreign_thread_wakes_reader() {
        // The producer side runs on a plain thread, exactly like a
        // transport delivery callback.
        let queue = Arc::new(ByteQueue::new());
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for chunk in [[1u8, 2], [3, 4]] {
                    queue.append(&chunk);
                }
            })
        };

        let bytes = queue.take_exactly(4).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4]);
        producer.join().unwrap();
    }

    #[tokio::test]
    async fn test_sequential_reads_preserve_fifo_order() {
        let queue = Arc::new(ByteQueue::new());
        queue.append(&(0..10).collect::<Vec<u8>>());

        assert_eq!(queue.take_exactly(4).await.unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(queue.take_exactly(4).await.unwrap(), vec![4, 5, 6, 7]);
        assert_eq!(queue.take_available(), vec![8, 9]);
    }

    #[tokio::test]
    async fn test_wakeup_without_enough_bytes_keeps_waiting() {
        // A coalesced wakeup must not produce a short read: the future is
        // woken but stays pending until the full count is there.
        let queue = Arc::new(ByteQueue::new());
        let mut read = tokio_test::task::spawn(queue.take_exactly(3));
        assert_pending!(read.poll());

        queue.append(&[1]);
        assert_pending!(read.poll());
        queue.append(&[2]);
        assert_pending!(read.poll());
        queue.append(&[3]);
        let bytes = assert_ready!(read.poll()).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
