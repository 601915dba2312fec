//! Deduplicating "seen at least twice" queue.
//!
//! Candidate files are only worth hashing or comparing when at least one
//! other file shares their composite key. [`FileQueue`] buffers the first
//! record observed under each key; the second observation flushes both the
//! stored record and the new one to consumers, and every later observation
//! flows straight through. Records under singleton keys are never released.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use super::CANCEL_POLL_INTERVAL;

/// Multi-producer/multi-consumer queue that withholds singleton keys.
#[derive(Debug)]
pub struct FileQueue<K, T> {
    state: Mutex<State<K, T>>,
    cv: Condvar,
}

#[derive(Debug)]
struct State<K, T> {
    // Key -> (flushed, first record seen under the key).
    seen: HashMap<K, (bool, T)>,
    ready: VecDeque<T>,
    finished: bool,
}

impl<K, T> Default for FileQueue<K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> FileQueue<K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                seen: HashMap::new(),
                ready: VecDeque::new(),
                finished: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Record an observation of `value` under `key`.
    ///
    /// The first observation of a key is stored and nothing becomes
    /// consumable. The second observation releases the stored record
    /// followed by the new one; later observations release only the new
    /// record. Consumers are only woken when something was released.
    pub fn push(&self, key: K, value: T) {
        let released = {
            let mut state = self.state.lock().unwrap();
            match state.seen.get_mut(&key) {
                Some(entry) => {
                    if !entry.0 {
                        entry.0 = true;
                        let first = entry.1.clone();
                        state.ready.push_back(first);
                    }
                    state.ready.push_back(value);
                    true
                }
                None => {
                    state.seen.insert(key, (false, value));
                    false
                }
            }
        };
        if released {
            self.cv.notify_one();
        }
    }

    /// Enqueue `value` unconditionally, bypassing the key discipline.
    pub fn push_passthrough(&self, value: T) {
        {
            let mut state = self.state.lock().unwrap();
            state.ready.push_back(value);
        }
        self.cv.notify_one();
    }

    /// Block until a record is consumable, the queue is finished and
    /// drained, or the run is cancelled.
    pub fn pop(&self, cancel: &AtomicBool) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        while state.ready.is_empty() && !state.finished && !cancel.load(Ordering::SeqCst) {
            let (guard, _) = self.cv.wait_timeout(state, CANCEL_POLL_INTERVAL).unwrap();
            state = guard;
        }
        if cancel.load(Ordering::SeqCst) {
            return None;
        }
        state.ready.pop_front()
    }

    /// Mark end-of-input. Must be called exactly once, after every producer
    /// has terminated; consumers then drain the remaining records.
    pub fn set_finished(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.finished = true;
        }
        self.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn drain(queue: &FileQueue<u64, &'static str>) -> Vec<&'static str> {
        let cancel = AtomicBool::new(false);
        let mut out = Vec::new();
        while let Some(v) = queue.pop(&cancel) {
            out.push(v);
        }
        out
    }

    #[test]
    fn test_singleton_keys_are_withheld() {
        let queue = FileQueue::new();
        queue.push(1, "a");
        queue.push(2, "b");
        queue.set_finished();

        assert!(drain(&queue).is_empty());
    }

    #[test]
    fn test_second_observation_releases_both() {
        let queue = FileQueue::new();
        queue.push(7, "first");
        queue.push(7, "second");
        queue.set_finished();

        assert_eq!(drain(&queue), vec!["first", "second"]);
    }

    #[test]
    fn test_later_observations_release_one_each() {
        let queue = FileQueue::new();
        queue.push(7, "a");
        queue.push(7, "b");
        queue.push(7, "c");
        queue.push(7, "d");
        queue.set_finished();

        assert_eq!(drain(&queue), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_keys_are_independent() {
        let queue = FileQueue::new();
        queue.push(1, "x1");
        queue.push(2, "y1");
        queue.push(2, "y2");
        queue.push(1, "x2");
        queue.set_finished();

        // Each pair flushes in the order its second member arrived.
        assert_eq!(drain(&queue), vec!["y1", "y2", "x1", "x2"]);
    }

    #[test]
    fn test_passthrough_ignores_key_discipline() {
        let queue: FileQueue<u64, &'static str> = FileQueue::new();
        queue.push_passthrough("solo");
        queue.set_finished();

        assert_eq!(drain(&queue), vec!["solo"]);
    }

    #[test]
    fn test_cancel_returns_none_with_items_queued() {
        let queue = FileQueue::new();
        queue.push(1, "a");
        queue.push(1, "b");

        let cancel = AtomicBool::new(true);
        assert_eq!(queue.pop(&cancel), None);
    }

    #[test]
    fn test_concurrent_producers_deliver_exact_multiplicity() {
        let queue: Arc<FileQueue<u64, usize>> = Arc::new(FileQueue::new());
        let mut producers = Vec::new();
        for t in 0..4 {
            let q = Arc::clone(&queue);
            producers.push(thread::spawn(move || {
                for i in 0..50u64 {
                    q.push(i, t * 1000 + i as usize);
                }
            }));
        }
        for p in producers {
            p.join().unwrap();
        }
        queue.set_finished();

        let cancel = AtomicBool::new(false);
        let mut count = 0;
        while queue.pop(&cancel).is_some() {
            count += 1;
        }
        // Every key is pushed once by each of the four producers, so every
        // record must come out.
        assert_eq!(count, 4 * 50);
    }
}
