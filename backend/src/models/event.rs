//! Events, event handles and execution contexts
//!
//! An [`Event`] is owned by the event queue from insertion until it is popped
//! or cancelled. Callers hold an [`EventId`] instead: a small `Copy` handle
//! that names the event's arena slot and generation, so a stale handle is
//! detected in O(1) without touching the event itself.

use crate::core::time::SimTime;
use crate::orchestrator::Simulator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Executable body of an event
///
/// Actions receive the simulator so they can read the clock and schedule
/// follow-up events. They are `Send` because cross-context actions are built
/// on producer threads and handed to the driver through the inbox.
pub type Action = Box<dyn FnOnce(&mut Simulator) + Send + 'static>;

/// Execution context tag
///
/// Distinguishes events produced by the main timeline from events produced
/// by external contexts such as a co-simulation bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(u32);

impl ContextId {
    /// Default context of the main timeline
    pub const MAIN: ContextId = ContextId(0);

    /// Reserved for destroy-phase handles; never executes on the timeline
    pub const DESTROY: ContextId = ContextId(u32::MAX);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        ContextId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::DESTROY {
            write!(f, "ctx:destroy")
        } else {
            write!(f, "ctx:{}", self.0)
        }
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::MAIN
    }
}

/// Ordering key of a queued event: timestamp first, then uid
///
/// Uids are handed out in queue-insertion order, so equal timestamps are
/// served first-inserted-first-served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    pub ts: SimTime,
    pub uid: u64,
}

impl EventKey {
    #[inline]
    pub fn new(ts: SimTime, uid: u64) -> Self {
        Self { ts, uid }
    }
}

/// Handle to a scheduled event
///
/// Valid only while the event is pending; once it executes or is cancelled
/// the handle is permanently expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    context: ContextId,
    uid: u64,
    ts: SimTime,
    slot: u32,
    generation: u32,
}

impl EventId {
    pub(crate) fn new(context: ContextId, key: EventKey, slot: u32, generation: u32) -> Self {
        Self {
            context,
            uid: key.uid,
            ts: key.ts,
            slot,
            generation,
        }
    }

    /// Handle for a destroy-phase event (no timeline slot)
    pub(crate) fn destroy(uid: u64) -> Self {
        Self {
            context: ContextId::DESTROY,
            uid,
            ts: SimTime::MAX,
            slot: u32::MAX,
            generation: 0,
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Absolute time the event was scheduled for
    pub fn timestamp(&self) -> SimTime {
        self.ts
    }

    pub fn is_destroy(&self) -> bool {
        self.context == ContextId::DESTROY
    }

    pub(crate) fn key(&self) -> EventKey {
        EventKey::new(self.ts, self.uid)
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot as usize
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E#{}@{}/{}", self.uid, self.ts, self.context)
    }
}

/// A queued unit of work
pub struct Event {
    pub key: EventKey,
    pub context: ContextId,
    pub action: Action,
}

impl Event {
    pub fn new(key: EventKey, context: ContextId, action: Action) -> Self {
        Self {
            key,
            context,
            action,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("ts", &self.key.ts)
            .field("uid", &self.key.uid)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Smallest `(ts, uid)` sorts first
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Event {}

/// An event buffered in the cross-context inbox
///
/// Carries no uid yet: it is normalized into an [`Event`] (and given a uid
/// from the shared counter) only when the driver drains the inbox.
pub struct EventWithContext {
    pub context: ContextId,
    pub timestamp: SimTime,
    pub action: Action,
}

impl fmt::Debug for EventWithContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventWithContext")
            .field("context", &self.context)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}
