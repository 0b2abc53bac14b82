//! Event queue and its pluggable ordering index
//!
//! [`EventQueue`] owns pending events in a slot arena. The ordering itself is
//! delegated to a [`Scheduler`] index that only sees `(key, slot)` entries,
//! so backends can be swapped at runtime without touching event storage.
//!
//! Available backends:
//! - **map**: ordered tree (`BTreeSet`), exact O(log n) removal
//! - **heap**: binary heap with lazy deletion, cheapest insert/pop

pub mod heap;
pub mod map;
pub mod queue;

pub use heap::HeapScheduler;
pub use map::MapScheduler;
pub use queue::EventQueue;

use crate::models::event::EventKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the ordering index
///
/// Sorted by key; the slot only tells the queue where the event lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entry {
    pub key: EventKey,
    pub slot: u32,
}

/// Ordering index over pending events
///
/// Implementations must return entries in ascending `(ts, uid)` order.
pub trait Scheduler: Send {
    /// Which backend this is
    fn kind(&self) -> SchedulerKind;

    fn insert(&mut self, entry: Entry);

    /// Smallest entry without removing it
    fn peek(&self) -> Option<Entry>;

    /// Remove and return the smallest entry
    fn pop(&mut self) -> Option<Entry>;

    /// Remove an arbitrary entry
    ///
    /// The caller guarantees `entry` is currently in the index.
    fn remove(&mut self, entry: Entry);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scheduler backend selection (configurable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    #[default]
    Map,
    Heap,
}

impl SchedulerKind {
    /// Build an empty index of this kind
    pub fn build(self) -> Box<dyn Scheduler> {
        match self {
            SchedulerKind::Map => Box::new(MapScheduler::new()),
            SchedulerKind::Heap => Box::new(HeapScheduler::new()),
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerKind::Map => write!(f, "map"),
            SchedulerKind::Heap => write!(f, "heap"),
        }
    }
}
