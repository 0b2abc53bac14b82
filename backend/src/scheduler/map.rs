//! Ordered-tree scheduler backend

use super::{Entry, Scheduler, SchedulerKind};
use std::collections::BTreeSet;

/// `BTreeSet`-backed index: O(log n) insert, pop and removal
#[derive(Debug, Default)]
pub struct MapScheduler {
    entries: BTreeSet<Entry>,
}

impl MapScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for MapScheduler {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Map
    }

    fn insert(&mut self, entry: Entry) {
        self.entries.insert(entry);
    }

    fn peek(&self) -> Option<Entry> {
        self.entries.first().copied()
    }

    fn pop(&mut self) -> Option<Entry> {
        self.entries.pop_first()
    }

    fn remove(&mut self, entry: Entry) {
        let removed = self.entries.remove(&entry);
        debug_assert!(removed, "removed entry {:?} was not indexed", entry);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
