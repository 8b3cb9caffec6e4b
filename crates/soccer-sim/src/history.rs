//! Fixed-capacity rolling history.
//!
//! [`History`] keeps the most recent `N` values pushed into it. Pushing into a
//! full history evicts the oldest entry, so `len() <= N` holds structurally.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A bounded FIFO of the last `N` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History<T, const N: usize> {
    entries: VecDeque<T>,
}

impl<T, const N: usize> History<T, N> {
    /// Create an empty history.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(N),
        }
    }

    /// Append a value, evicting the oldest one if the history is full.
    pub fn push(&mut self, value: T) {
        if N == 0 {
            return;
        }
        if self.entries.len() == N {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the history holds `N` entries.
    pub fn is_full(&self) -> bool {
        self.entries.len() == N
    }

    /// Maximum number of retained entries.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Oldest retained entry.
    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Most recently pushed entry.
    pub fn newest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Entry `back` positions before the newest one (`0` is the newest).
    pub fn from_newest(&self, back: usize) -> Option<&T> {
        let len = self.entries.len();
        if back >= len {
            return None;
        }
        self.entries.get(len - 1 - back)
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T, const N: usize> Default for History<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_history_is_empty() {
        let h: History<u32, 3> = History::new();
        assert!(h.is_empty());
        assert_eq!(h.capacity(), 3);
        assert_eq!(h.newest(), None);
        assert_eq!(h.oldest(), None);
    }

    #[test]
    fn push_evicts_oldest_when_full() {
        let mut h: History<u32, 3> = History::new();
        for v in 1..=5 {
            h.push(v);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(h.oldest(), Some(&3));
        assert_eq!(h.newest(), Some(&5));
    }

    #[test]
    fn from_newest_indexes_backwards() {
        let mut h: History<Option<usize>, 3> = History::new();
        h.push(None);
        h.push(Some(2));
        h.push(Some(1));
        assert_eq!(h.from_newest(0), Some(&Some(1)));
        assert_eq!(h.from_newest(1), Some(&Some(2)));
        assert_eq!(h.from_newest(2), Some(&None));
        assert_eq!(h.from_newest(3), None);
    }

    #[test]
    fn clear_empties_history() {
        let mut h: History<u32, 3> = History::new();
        h.push(1);
        h.push(2);
        h.clear();
        assert!(h.is_empty());
        assert!(!h.is_full());
    }

    #[test]
    fn zero_capacity_history_stays_empty() {
        let mut h: History<u32, 0> = History::new();
        h.push(7);
        assert!(h.is_empty());
    }
}
