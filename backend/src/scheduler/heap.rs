//! Binary-heap scheduler backend
//!
//! `BinaryHeap` cannot remove arbitrary elements, so removal records a
//! tombstone instead. Tombstoned entries are purged whenever they reach the
//! top, which keeps the invariant that `peek` always returns a live entry.

use super::{Entry, Scheduler, SchedulerKind};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

#[derive(Debug, Default)]
pub struct HeapScheduler {
    heap: BinaryHeap<Reverse<Entry>>,
    tombstones: HashSet<Entry>,
}

impl HeapScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn purge_top(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            if !self.tombstones.remove(top) {
                break;
            }
            self.heap.pop();
        }
    }
}

impl Scheduler for HeapScheduler {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Heap
    }

    fn insert(&mut self, entry: Entry) {
        self.heap.push(Reverse(entry));
    }

    fn peek(&self) -> Option<Entry> {
        self.heap.peek().map(|Reverse(e)| *e)
    }

    fn pop(&mut self) -> Option<Entry> {
        let Reverse(entry) = self.heap.pop()?;
        self.purge_top();
        Some(entry)
    }

    fn remove(&mut self, entry: Entry) {
        self.tombstones.insert(entry);
        self.purge_top();
    }

    fn len(&self) -> usize {
        self.heap.len() - self.tombstones.len()
    }
}
