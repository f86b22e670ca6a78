//! Fixed-capacity outbound buffer used while the connection is down.

use std::collections::VecDeque;

/// A bounded FIFO that evicts its oldest entry when full.
///
/// Holds frames sent while disconnected. On reconnect the manager drains
/// it in insertion order.
#[derive(Debug, Clone)]
pub struct LruBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> LruBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an item. Returns the evicted item if the buffer was full.
    ///
    /// With a capacity of 0 the pushed item itself is returned.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Removes and returns every buffered item, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of items held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
