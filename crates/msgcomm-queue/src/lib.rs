//! Thread-safe FIFO that moves ownership of its items.
//!
//! Items go in by value and come out by value: exactly one `dequeue`
//! returns any given item. The only way an item leaves without being
//! dequeued is [`OwnedQueue::drain_and_dispose`] (also run on drop).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// A named, mutex-guarded FIFO of owned items.
#[derive(Debug)]
pub struct OwnedQueue<T> {
    name: String,
    items: Mutex<VecDeque<T>>,
}

impl<T> OwnedQueue<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Append `item` at the back; the queue becomes its sole owner.
    pub fn enqueue(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Remove and return the front item, or `None` when empty.
    pub fn dequeue(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Drop every remaining item. Returns how many were discarded.
    pub fn drain_and_dispose(&self) -> usize {
        let drained: Vec<T> = self.lock().drain(..).collect();
        let count = drained.len();
        drop(drained);
        if count > 0 {
            debug!(queue = %self.name, discarded = count, "queue drained");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Drop for OwnedQueue<T> {
    fn drop(&mut self) {
        self.drain_and_dispose();
    }
}
