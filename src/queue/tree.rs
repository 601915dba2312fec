//! Work queue for self-producing tree traversal.
//!
//! Directory traversal is peculiar: the workers that consume directories are
//! the same workers that discover and enqueue subdirectories. An empty queue
//! therefore does not mean the traversal is over; it is only over once every
//! worker is simultaneously blocked waiting for work. [`TreeQueue`] encodes
//! that termination condition directly: it counts waiting workers and, when
//! all of them are idle at once, latches a terminal `drained` state that
//! makes every subsequent `pop` return `None`.
//!
//! The queue must be constructed with the exact number of worker threads
//! that will call [`TreeQueue::pop`], and at least one item should be pushed
//! before the first pop (otherwise the workers correctly conclude there is
//! nothing to do).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use super::CANCEL_POLL_INTERVAL;

/// Blocking work queue that knows when a traversal forest is exhausted.
#[derive(Debug)]
pub struct TreeQueue<T> {
    state: Mutex<State<T>>,
    cv: Condvar,
    workers: usize,
}

#[derive(Debug)]
struct State<T> {
    tasks: VecDeque<T>,
    waiting: usize,
    drained: bool,
}

impl<T> TreeQueue<T> {
    /// Create a queue for exactly `workers` consumer threads.
    ///
    /// # Panics
    ///
    /// Panics if `workers` is zero; the idle-quiescence protocol is
    /// meaningless without consumers.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        assert!(workers > 0, "TreeQueue requires at least one worker");
        Self {
            state: Mutex::new(State {
                tasks: VecDeque::new(),
                waiting: 0,
                drained: false,
            }),
            cv: Condvar::new(),
            workers,
        }
    }

    /// Enqueue an item and wake one waiting worker.
    pub fn push(&self, item: T) {
        {
            let mut state = self.state.lock().unwrap();
            state.tasks.push_back(item);
        }
        self.cv.notify_one();
    }

    /// Block until an item is available, the forest is exhausted, or the
    /// run is cancelled.
    ///
    /// Returns `None` once all `workers` threads are simultaneously waiting
    /// with no queued work (the terminal drained state), or when `cancel`
    /// is observed.
    pub fn pop(&self, cancel: &AtomicBool) -> Option<T> {
        let mut state = self.state.lock().unwrap();

        state.waiting += 1;
        if state.waiting >= self.workers {
            state.drained = true;
            self.cv.notify_all();
        }

        while state.tasks.is_empty() && !state.drained && !cancel.load(Ordering::SeqCst) {
            let (guard, _) = self.cv.wait_timeout(state, CANCEL_POLL_INTERVAL).unwrap();
            state = guard;
        }
        state.waiting -= 1;

        if cancel.load(Ordering::SeqCst) {
            return None;
        }
        state.tasks.pop_front()
    }
}
