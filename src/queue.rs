//! Bounded blocking hand-off queue between the accept loop and the
//! worker pool.
//!
//! A `Mutex` plus two `Condvar`s gives a blocking/FIFO contract
//! equivalent to a mutex-guarded ring of descriptors with a pair of
//! counting semaphores, without needing a fixed-capacity array.
//!
//! Generic over the payload so tests can exercise FIFO/blocking behavior
//! with plain integers instead of live sockets.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Ring<T> {
    buf: VecDeque<T>,
    cap: usize,
    closed: bool,
}

/// A fixed-capacity FIFO that blocks producers when full and consumers
/// when empty.
pub struct HandoffQueue<T> {
    state: Mutex<Ring<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> HandoffQueue<T> {
    /// Create a queue that holds at most `cap` items.
    pub fn new(cap: usize) -> Self {
        Self {
            state: Mutex::new(Ring {
                buf: VecDeque::with_capacity(cap),
                cap,
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Block while the queue is full, then push `item` at the rear and
    /// wake one waiting consumer. Never drops, never reorders.
    ///
    /// No-op if the queue has been [`close`](Self::close)d. The accept
    /// loop never closes the queue in production; this path is only
    /// exercised by tests tearing a pool down.
    pub fn insert(&self, item: T) {
        let mut state = self.state.lock().unwrap();
        while state.buf.len() == state.cap && !state.closed {
            state = self.not_full.wait(state).unwrap();
        }
        if state.closed {
            return;
        }
        state.buf.push_back(item);
        self.not_empty.notify_one();
    }

    /// Block while the queue is empty, then pop the front item and wake
    /// one waiting producer. Returns `None` only once the queue has been
    /// closed and drained.
    pub fn remove(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(item) = state.buf.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Wake every blocked producer/consumer and make future `remove`
    /// calls return `None` once drained. The production binary never
    /// calls this; it exists so tests can terminate worker threads
    /// deterministically.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Current number of buffered items (test/diagnostic use only).
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let q = HandoffQueue::new(4);
        q.insert(1);
        q.insert(2);
        q.insert(3);
        assert_eq!(q.remove(), Some(1));
        assert_eq!(q.remove(), Some(2));
        assert_eq!(q.remove(), Some(3));
    }

    #[test]
    fn test_insert_blocks_when_full_then_unblocks_on_remove() {
        let q = Arc::new(HandoffQueue::new(2));
        q.insert(1);
        q.insert(2);

        let q2 = Arc::clone(&q);
        let producer = thread::spawn(move || {
            q2.insert(3);
        });

        // Give the producer a chance to actually block on a full queue.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(q.len(), 2);

        assert_eq!(q.remove(), Some(1));
        producer.join().unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.remove(), Some(2));
        assert_eq!(q.remove(), Some(3));
    }

    #[test]
    fn test_remove_blocks_when_empty_then_unblocks_on_insert() {
        let q = Arc::new(HandoffQueue::new(4));
        let q2 = Arc::clone(&q);
        let consumer = thread::spawn(move || q2.remove());

        thread::sleep(Duration::from_millis(50));
        q.insert(42);

        assert_eq!(consumer.join().unwrap(), Some(42));
    }

    #[test]
    fn test_close_wakes_blocked_consumers_with_none() {
        let q = Arc::new(HandoffQueue::<i32>::new(4));
        let q2 = Arc::clone(&q);
        let consumer = thread::spawn(move || q2.remove());

        thread::sleep(Duration::from_millis(50));
        q.close();

        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn test_close_drains_remaining_items_before_returning_none() {
        let q = HandoffQueue::new(4);
        q.insert(1);
        q.insert(2);
        q.close();

        assert_eq!(q.remove(), Some(1));
        assert_eq!(q.remove(), Some(2));
        assert_eq!(q.remove(), None);
    }

    #[test]
    fn test_many_producers_many_consumers_preserve_all_items() {
        let q = Arc::new(HandoffQueue::new(8));
        let producers: Vec<_> = (0..4)
            .map(|t| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..25 {
                        q.insert(t * 100 + i);
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    let mut got = Vec::new();
                    for _ in 0..25 {
                        got.push(q.remove().unwrap());
                    }
                    got
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        let mut all: Vec<i32> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();
        all.sort_unstable();

        let mut expected: Vec<i32> = (0..4).flat_map(|t| (0..25).map(move |i| t * 100 + i)).collect();
        expected.sort_unstable();
        assert_eq!(all, expected);
    }
}
