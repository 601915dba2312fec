//! Pairing queue with a busy-left-side discipline.
//!
//! [`PairQueue`] collects keyed records and materializes every unordered
//! pair of records that share a key, handing those pairs to comparison
//! workers. Two rules shape its `pop`:
//!
//! - a pair is only issued when neither of its sides is currently part of
//!   an in-flight comparison, so a worker may keep per-file state (an open
//!   handle, a warm buffer) across consecutive pairs with the same left
//!   side;
//! - distinct left sides are issued concurrently.
//!
//! The queue doubles as the final grouping store: when no byte-level
//! comparison is requested, [`PairQueue::build_grouped_list`] derives the
//! result groups directly from the keyed store.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use crate::groups::GroupId;

use super::CANCEL_POLL_INTERVAL;

/// Queue of same-key record pairs, and the grouping store of last resort.
#[derive(Debug)]
pub struct PairQueue<K, T> {
    state: Mutex<State<K, T>>,
    cv: Condvar,
}

#[derive(Debug)]
struct State<K, T> {
    by_key: HashMap<K, Vec<T>>,
    pool: Vec<T>,
    pairs: VecDeque<(T, T)>,
    busy_left: HashSet<T>,
    finished: bool,
    // Every queued pair currently touches an in-flight left side; pops must
    // wait for a set_processed before rescanning.
    busy: bool,
}

impl<K, T> Default for PairQueue<K, T>
where
    K: Eq + Hash,
    T: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> PairQueue<K, T>
where
    K: Eq + Hash,
    T: Clone + Eq + Hash,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                by_key: HashMap::new(),
                pool: Vec::new(),
                pairs: VecDeque::new(),
                busy_left: HashSet::new(),
                finished: false,
                busy: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Store `value` under `key` and, unless `just_collect` is set, enqueue
    /// one pair against every record previously stored under the same key.
    pub fn push(&self, key: K, value: T, just_collect: bool) {
        {
            let mut state = self.state.lock().unwrap();
            if !just_collect {
                if let Some(existing) = state.by_key.get(&key) {
                    let new_pairs: Vec<(T, T)> = existing
                        .iter()
                        .map(|prior| (value.clone(), prior.clone()))
                        .collect();
                    state.pairs.extend(new_pairs);
                }
            }
            state.by_key.entry(key).or_default().push(value);
            state.busy = false;
        }
        self.cv.notify_one();
    }

    /// Pair `value` with every record in the untyped pool, then pool it.
    pub fn push_passthrough(&self, value: T) {
        {
            let mut state = self.state.lock().unwrap();
            let new_pairs: Vec<(T, T)> = state
                .pool
                .iter()
                .map(|prior| (value.clone(), prior.clone()))
                .collect();
            state.pairs.extend(new_pairs);
            state.pool.push(value);
            state.busy = false;
        }
        self.cv.notify_one();
    }

    /// Block until an eligible pair can be issued.
    ///
    /// Pairs are issued FIFO, skipping any whose left or right side is part
    /// of an in-flight comparison. The returned pair's left side joins the
    /// busy set; the consumer must hand the pair back via
    /// [`PairQueue::set_processed`]. Returns `None` once finished and
    /// drained, or on cancellation.
    pub fn pop(&self, cancel: &AtomicBool) -> Option<(T, T)> {
        let mut state = self.state.lock().unwrap();
        loop {
            while state.busy
                || (state.pairs.is_empty() && !state.finished && !cancel.load(Ordering::SeqCst))
            {
                if cancel.load(Ordering::SeqCst) {
                    return None;
                }
                let (guard, _) = self.cv.wait_timeout(state, CANCEL_POLL_INTERVAL).unwrap();
                state = guard;
            }

            if cancel.load(Ordering::SeqCst) || state.pairs.is_empty() {
                return None;
            }

            let eligible = state
                .pairs
                .iter()
                .position(|(a, b)| !state.busy_left.contains(a) && !state.busy_left.contains(b));

            match eligible {
                Some(index) => {
                    let pair = state.pairs.remove(index).unwrap();
                    state.busy_left.insert(pair.0.clone());
                    return Some(pair);
                }
                None => {
                    state.busy = true;
                }
            }
        }
    }

    /// Release the pair's left side and let blocked pops rescan the queue.
    pub fn set_processed(&self, pair: &(T, T)) {
        {
            let mut state = self.state.lock().unwrap();
            state.busy_left.remove(&pair.0);
            state.busy = false;
        }
        self.cv.notify_all();
    }

    /// Mark end-of-input. Must be called exactly once, after every producer
    /// has terminated.
    pub fn set_finished(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.finished = true;
        }
        self.cv.notify_all();
    }

    /// Derive the final grouping from the keyed store: one fresh group id
    /// per distinct key. Includes singleton groups; callers filter them.
    #[must_use]
    pub fn build_grouped_list(&self) -> HashMap<GroupId, Vec<T>> {
        let state = self.state.lock().unwrap();
        let mut grouped = HashMap::new();
        let mut next_id: GroupId = 0;
        for members in state.by_key.values() {
            grouped.insert(next_id, members.clone());
            next_id += 1;
        }
        grouped
    }
}
