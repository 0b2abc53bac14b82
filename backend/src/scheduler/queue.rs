//! Arena-backed event queue
//!
//! Events live in a slot vector; each slot carries a generation counter
//! that is bumped whenever the slot is released. An [`EventId`] records the
//! slot and generation it was issued for, so lookups of executed or
//! cancelled events fail in O(1) without scanning the index.

use super::{Entry, Scheduler, SchedulerKind};
use crate::error::{SimResult, SimulatorError};
use crate::models::event::{Action, ContextId, Event, EventId, EventKey};

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    event: Option<Event>,
}

/// Pending events ordered by `(timestamp, uid)`
pub struct EventQueue {
    index: Box<dyn Scheduler>,
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl EventQueue {
    pub fn new(kind: SchedulerKind) -> Self {
        Self {
            index: kind.build(),
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn kind(&self) -> SchedulerKind {
        self.index.kind()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Insert an event and return its handle
    pub fn insert(&mut self, key: EventKey, context: ContextId, action: Action) -> EventId {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let cell = &mut self.slots[slot as usize];
        cell.event = Some(Event::new(key, context, action));
        self.index.insert(Entry { key, slot });
        EventId::new(context, key, slot, cell.generation)
    }

    /// Key of the next event, or `EmptyQueue`
    pub fn peek_key(&self) -> SimResult<EventKey> {
        self.index
            .peek()
            .map(|e| e.key)
            .ok_or(SimulatorError::EmptyQueue)
    }

    /// Next event without removing it, or `EmptyQueue`
    pub fn peek_min(&self) -> SimResult<&Event> {
        let entry = self.index.peek().ok_or(SimulatorError::EmptyQueue)?;
        self.slots[entry.slot as usize]
            .event
            .as_ref()
            .ok_or(SimulatorError::EmptyQueue)
    }

    /// Remove and return the next event, or `EmptyQueue`
    pub fn pop_min(&mut self) -> SimResult<Event> {
        let entry = self.index.pop().ok_or(SimulatorError::EmptyQueue)?;
        self.release(entry.slot).ok_or(SimulatorError::EmptyQueue)
    }

    /// True while `id` names a pending event
    pub fn contains(&self, id: &EventId) -> bool {
        self.live_entry(id).is_some()
    }

    /// Excise a pending event by handle
    ///
    /// Fails with `NotFound` if the handle is stale (executed, cancelled or
    /// issued by another queue generation).
    pub fn remove(&mut self, id: &EventId) -> SimResult<Event> {
        let entry = self.live_entry(id).ok_or(SimulatorError::NotFound(*id))?;
        self.index.remove(entry);
        self.release(entry.slot).ok_or(SimulatorError::NotFound(*id))
    }

    /// Rebuild the ordering index with a different backend
    ///
    /// Slots and handles are untouched; only the index is replaced.
    pub fn set_scheduler(&mut self, kind: SchedulerKind) {
        let mut next = kind.build();
        while let Some(entry) = self.index.pop() {
            next.insert(entry);
        }
        self.index = next;
    }

    /// Remove every pending event in timestamp order
    pub fn drain_ordered(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.len());
        while let Ok(event) = self.pop_min() {
            events.push(event);
        }
        events
    }

    fn live_entry(&self, id: &EventId) -> Option<Entry> {
        let slot = self.slots.get(id.slot())?;
        if slot.generation != id.generation() {
            return None;
        }
        let event = slot.event.as_ref()?;
        (event.key == id.key()).then(|| Entry {
            key: event.key,
            slot: id.slot() as u32,
        })
    }

    fn release(&mut self, slot: u32) -> Option<Event> {
        let cell = &mut self.slots[slot as usize];
        let event = cell.event.take()?;
        cell.generation = cell.generation.wrapping_add(1);
        self.free.push(slot);
        Some(event)
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("kind", &self.kind())
            .field("len", &self.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}
