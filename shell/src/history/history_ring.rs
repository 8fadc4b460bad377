// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A fixed capacity ring of previously entered command lines. Once the ring is full,
//! adding a line evicts the oldest one. Logical index `0` is always the oldest line that
//! is still retained, and `count() - 1` is the newest.

/// Default number of lines retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 32;

/// Default per entry storage, including one byte for the terminator that the stored
/// text never uses. So a stored entry holds at most `entry_size - 1` bytes.
pub const DEFAULT_HISTORY_ENTRY_SIZE: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRing {
    internal_storage: Vec<Option<String>>,
    capacity: usize,
    entry_size: usize,
    head: usize,
    tail: usize,
    count: usize,
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, DEFAULT_HISTORY_ENTRY_SIZE)
    }
}

impl HistoryRing {
    /// A `capacity` of `0` is bumped to `1`, and an `entry_size` below `2` is bumped to
    /// `2`, so that every ring can hold at least one non empty line.
    #[must_use]
    pub fn new(capacity: usize, entry_size: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            internal_storage: Vec::with_capacity(capacity),
            capacity,
            entry_size: entry_size.max(2),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Drop all the lines and start over with the given sizes.
    pub fn init(&mut self, capacity: usize, entry_size: usize) {
        *self = Self::new(capacity, entry_size);
    }

    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    #[must_use]
    pub fn entry_size(&self) -> usize { self.entry_size }

    #[must_use]
    pub fn count(&self) -> usize { self.count }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.count == 0 }

    /// Insert at head (ie, insert the newest line). Empty lines are ignored, and lines
    /// longer than `entry_size - 1` bytes are truncated. Returns `true` if the line was
    /// stored.
    pub fn push_back(&mut self, line: &str) -> bool {
        if line.is_empty() {
            return false;
        }

        let value = truncate_at_char_boundary(line, self.entry_size - 1).to_string();

        if self.count == self.capacity {
            let _unused: Option<_> = self.remove_oldest();
        }
        if self.internal_storage.len() < self.capacity {
            self.internal_storage.push(Some(value));
        } else {
            self.internal_storage[self.head] = Some(value);
        }
        self.head = (self.head + 1) % self.capacity;
        self.count = std::cmp::min(self.count + 1, self.capacity);

        true
    }

    /// Logical index `0` is the oldest retained line.
    #[must_use]
    pub fn get(&self, logical_index: usize) -> Option<&str> {
        if logical_index >= self.count {
            return None;
        }
        let actual_index = (self.tail + logical_index) % self.capacity;
        self.internal_storage
            .get(actual_index)
            .and_then(|item| item.as_deref())
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.count).filter_map(|index| self.get(index))
    }

    /// Remove from tail (ie, remove the oldest line).
    fn remove_oldest(&mut self) -> Option<String> {
        if self.count == 0 || self.internal_storage.is_empty() {
            return None;
        }
        let value = self.internal_storage[self.tail].take();
        self.tail = (self.tail + 1) % self.capacity;
        self.count -= 1;
        value
    }
}

fn truncate_at_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_push_and_get_in_insertion_order() {
        let mut ring = HistoryRing::new(4, 16);
        assert!(ring.push_back("ls"));
        assert!(ring.push_back("pwd"));

        assert_eq!(ring.count(), 2);
        assert_eq!(ring.get(0), Some("ls"));
        assert_eq!(ring.get(1), Some("pwd"));
        assert_eq!(ring.get(2), None);
    }

    #[test]
    fn test_empty_line_is_ignored() {
        let mut ring = HistoryRing::new(4, 16);
        assert!(!ring.push_back(""));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_full_ring_evicts_oldest() {
        let mut ring = HistoryRing::new(3, 16);
        for line in ["a", "b", "c", "d", "e"] {
            ring.push_back(line);
        }

        assert_eq!(ring.count(), 3);
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec!["c", "d", "e"]);
        assert_eq!(ring.get(0), Some("c"));
        assert_eq!(ring.get(2), Some("e"));
    }

    #[test]
    fn test_count_never_exceeds_capacity() {
        let mut ring = HistoryRing::new(2, 16);
        for i in 0..100 {
            ring.push_back(&format!("cmd{i}"));
            assert!(ring.count() <= ring.capacity());
        }
        assert_eq!(ring.get(0), Some("cmd98"));
        assert_eq!(ring.get(1), Some("cmd99"));
    }

    #[test]
    fn test_long_line_is_truncated() {
        let mut ring = HistoryRing::new(2, 6);
        ring.push_back("abcdefghij");
        assert_eq!(ring.get(0), Some("abcde"));
    }

    #[test]
    fn test_init_resets_and_clamps() {
        let mut ring = HistoryRing::new(2, 16);
        ring.push_back("ls");
        ring.init(0, 0);

        assert_eq!(ring.count(), 0);
        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.entry_size(), 2);
        ring.push_back("xyz");
        assert_eq!(ring.get(0), Some("x"));
    }
}
