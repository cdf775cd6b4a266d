//! Bounded recent-event buffer serving poll consumers.
//!
//! Insertion order = arrival order at the cache; the oldest event is
//! evicted first once capacity is reached. Never persisted; rebuilt
//! from live or replayed sources on restart.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::ingest::types::CanonicalEvent;

pub const DEFAULT_CAPACITY: usize = 100;

/// Thread-safe fixed-capacity ring buffer of canonical events.
///
/// The mutex is held only for the single insert or the copy-out,
/// never across I/O.
#[derive(Debug)]
pub struct EventCache {
    inner: Mutex<VecDeque<CanonicalEvent>>,
    cap: usize,
}

impl EventCache {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap)),
            cap,
        }
    }

    /// Append at the tail; evict the head when over capacity.
    pub fn push(&self, event: CanonicalEvent) {
        let mut buf = self.inner.lock().expect("event cache mutex poisoned");
        if buf.len() == self.cap {
            buf.pop_front();
        }
        buf.push_back(event);
    }

    /// Snapshot of the current contents, oldest first.
    pub fn read_all(&self) -> Vec<CanonicalEvent> {
        let buf = self.inner.lock().expect("event cache mutex poisoned");
        buf.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("event cache mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}
