use std::collections::VecDeque;

use serde::{Serialize, Deserialize};

use super::grid::Grid;

/// How many turns can be undone.
pub const MAX_UNDO_STEPS: usize = 10;

/// The board and score as they were right before a committed move.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub grid: Grid,
    pub score: u32,
}

/// Bounded undo stack. Once full, pushing a new snapshot drops the oldest one.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(MAX_UNDO_STEPS)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn snapshot(&mut self, grid: &Grid, score: u32) {
        self.entries.push_back(Snapshot { grid: *grid, score });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Pops the most recent snapshot, or `None` if nothing is left to undo.
    pub fn undo(&mut self) -> Option<Snapshot> {
        self.entries.pop_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
