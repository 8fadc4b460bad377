// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::HistoryRing;

/// What the editor should do with its buffer after an `Up` or `Down` key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryScroll<'a> {
    /// Replace the buffer with this entry.
    Entry(&'a str),
    /// Scrolled past the newest entry, so the buffer is emptied.
    Cleared,
    /// Nothing to do.
    Unchanged,
}

/// Cursor into a [`HistoryRing`]. The position is always in `[0, count]`, where `count`
/// means "past the newest entry", ie: the line being typed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryNavigator {
    position: usize,
}

impl HistoryNavigator {
    /// Park the cursor past the newest entry. Called when a new line starts.
    pub fn reset(&mut self, ring: &HistoryRing) { self.position = ring.count(); }

    #[must_use]
    pub fn position(&self) -> usize { self.position }

    /// Move towards older entries, stopping at the oldest one.
    pub fn scroll_up<'a>(&mut self, ring: &'a HistoryRing) -> HistoryScroll<'a> {
        if ring.is_empty() {
            self.position = 0;
            return HistoryScroll::Unchanged;
        }
        self.position = self.position.min(ring.count()).saturating_sub(1);
        ring.get(self.position)
            .map_or(HistoryScroll::Unchanged, HistoryScroll::Entry)
    }

    /// Move towards newer entries. Moving past the newest one clears the line.
    pub fn scroll_down<'a>(&mut self, ring: &'a HistoryRing) -> HistoryScroll<'a> {
        let count = ring.count();
        if self.position >= count {
            self.position = count;
            return HistoryScroll::Unchanged;
        }
        self.position += 1;
        if self.position == count {
            return HistoryScroll::Cleared;
        }
        ring.get(self.position)
            .map_or(HistoryScroll::Unchanged, HistoryScroll::Entry)
    }
}
