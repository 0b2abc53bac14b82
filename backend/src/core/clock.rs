//! Clock/context state
//!
//! Tracks what the simulator is doing right now: the current time, the
//! uid and context of the event being executed, and how many events have
//! been processed. Only the execution driver mutates it, exactly once per
//! popped event and before that event's action runs.

use crate::core::time::SimTime;
use crate::models::event::{ContextId, EventKey};
use serde::{Deserialize, Serialize};

/// Clock and context of the single execution thread
///
/// # Example
/// ```
/// use cosim_simulator_core_rs::core::clock::ClockState;
/// use cosim_simulator_core_rs::{ContextId, EventKey, SimTime};
///
/// let mut clock = ClockState::new(ContextId::MAIN);
/// let uid = clock.allocate_uid();
/// clock.advance(EventKey::new(SimTime::new(5), uid), ContextId::new(2));
///
/// assert_eq!(clock.now(), SimTime::new(5));
/// assert_eq!(clock.context(), ContextId::new(2));
/// assert_eq!(clock.event_count(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockState {
    now: SimTime,
    current_uid: u64,
    context: ContextId,
    event_count: u64,
    next_uid: u64,
}

impl ClockState {
    /// Clock at time zero, executing in `context`
    pub fn new(context: ContextId) -> Self {
        Self {
            now: SimTime::ZERO,
            current_uid: 0,
            context,
            event_count: 0,
            next_uid: 0,
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Uid of the event currently (or most recently) executing
    pub fn current_uid(&self) -> u64 {
        self.current_uid
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Number of events popped so far
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Mint the next uid
    ///
    /// Uids are handed out at queue-insertion time, so they double as the
    /// insertion-order tiebreak.
    pub fn allocate_uid(&mut self) -> u64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    /// Move the clock to a popped event
    pub fn advance(&mut self, key: EventKey, context: ContextId) {
        debug_assert!(
            key.ts >= self.now,
            "clock would move backwards: {} -> {}",
            self.now,
            key.ts
        );
        self.now = key.ts;
        self.current_uid = key.uid;
        self.context = context;
        self.event_count += 1;
    }
}
