//! Ring Buffer Implementation

use std::iter::FusedIterator;
use std::ops::Index;

/// Fixed-capacity FIFO ring buffer.
///
/// Pushing into a full buffer evicts the oldest entry. Storage is allocated
/// once; push, pop and indexed access are O(1).
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Pre-allocated storage
    storage: Box<[Option<T>]>,
    /// Next write position
    head: usize,
    /// Number of resident entries
    len: usize,
    /// Total entries written (for statistics)
    total_written: u64,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with given capacity
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Ring buffer capacity must be > 0");
        let storage: Vec<Option<T>> = (0..capacity).map(|_| None).collect();
        Self {
            storage: storage.into_boxed_slice(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an entry, returning the evicted oldest entry if the buffer was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let capacity = self.capacity();
        let evicted = self.storage[self.head].replace(item);
        self.head = (self.head + 1) % capacity;
        self.total_written += 1;

        if self.len < capacity {
            self.len += 1;
            None
        } else {
            evicted
        }
    }

    /// Remove and return the oldest entry
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let tail = self.tail();
        self.len -= 1;
        self.storage[tail].take()
    }

    /// Evict entries from the front while `predicate` holds, returning how many were removed
    pub fn evict_while<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = 0;
        while self.front().is_some_and(&mut predicate) {
            self.pop_front();
            removed += 1;
        }
        removed
    }

    /// Oldest entry
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Most recent entry
    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    /// Entry at `index`, where 0 is the oldest
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let idx = (self.tail() + index) % self.capacity();
        self.storage[idx].as_ref()
    }

    /// Iterate from oldest to most recent
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buffer: self,
            front: 0,
            back: self.len,
        }
    }

    /// Get the number of entries currently in the buffer
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    /// Get total entries written (for statistics)
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.storage.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }

    fn tail(&self) -> usize {
        (self.head + self.capacity() - self.len) % self.capacity()
    }
}

/// Oldest-to-newest iterator over a [`RingBuffer`]
pub struct Iter<'a, T> {
    buffer: &'a RingBuffer<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.buffer.get(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.buffer.get(self.back)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Index<usize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(item) => item,
            None => panic!("index {index} out of range for ring buffer of length {}", self.len),
        }
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
