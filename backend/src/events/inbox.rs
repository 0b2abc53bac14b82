//! Cross-context inbox
//!
//! Producers on other threads cannot touch the event queue, which belongs to
//! the driver thread. They push into this buffer instead, under a mutex that
//! guards nothing but the buffer itself, and the driver drains it into the
//! queue before every head inspection.
//!
//! # Causality floor
//!
//! The inbox also holds a time floor published by the driver. A push below
//! the floor is rejected on the producer's thread with `CausalityViolation`.
//! The driver raises the floor to the timestamp it is about to execute, but
//! only while the buffer is empty (checked under the same lock), so any
//! event that does get buffered is never earlier than the clock when it is
//! drained.

use crate::core::clock::ClockState;
use crate::core::time::SimTime;
use crate::error::{SimResult, SimulatorError};
use crate::models::event::{ContextId, EventKey, EventWithContext};
use crate::orchestrator::{RunState, Simulator};
use crate::scheduler::EventQueue;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{trace, warn};

#[derive(Debug, Default)]
struct InboxState {
    buffer: VecDeque<EventWithContext>,
    floor: SimTime,
    closed: bool,
}

/// Mutex-guarded buffer of events produced outside the driver thread
#[derive(Debug, Default)]
pub struct CrossContextInbox {
    state: Mutex<InboxState>,
}

impl CrossContextInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer an event for absolute time `timestamp`
    ///
    /// Safe to call from any thread. Fails with `CausalityViolation` if
    /// `timestamp` is below the floor, with `ReservedContext` for the destroy
    /// context, and with `InvalidState` once the simulator has been torn
    /// down. A failed push buffers nothing.
    pub fn push(&self, event: EventWithContext) -> SimResult<()> {
        check_timeline_context(event.context)?;
        let mut state = self.state.lock();
        if state.closed {
            return Err(SimulatorError::InvalidState {
                operation: "schedule_with_context",
                state: RunState::Destroyed,
            });
        }
        if event.timestamp < state.floor {
            warn!(
                context = %event.context,
                requested = %event.timestamp,
                floor = %state.floor,
                "rejected cross-context event scheduled in the past"
            );
            return Err(SimulatorError::CausalityViolation {
                requested: event.timestamp,
                current: state.floor,
            });
        }
        state.buffer.push_back(event);
        Ok(())
    }

    /// Buffer an event `delay` ticks after the floor; returns its timestamp
    pub fn push_after(
        &self,
        context: ContextId,
        delay: u64,
        action: crate::models::event::Action,
    ) -> SimResult<SimTime> {
        check_timeline_context(context)?;
        let mut state = self.state.lock();
        if state.closed {
            return Err(SimulatorError::InvalidState {
                operation: "schedule_with_context",
                state: RunState::Destroyed,
            });
        }
        let timestamp = state
            .floor
            .checked_add(delay)
            .ok_or(SimulatorError::TimeOverflow {
                base: state.floor,
                delay,
            })?;
        state.buffer.push_back(EventWithContext {
            context,
            timestamp,
            action,
        });
        Ok(timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Earliest buffered timestamp, if any
    pub fn earliest(&self) -> Option<SimTime> {
        self.state.lock().buffer.iter().map(|e| e.timestamp).min()
    }

    /// Current causality floor
    pub fn floor(&self) -> SimTime {
        self.state.lock().floor
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Move every buffered event into `queue`
    ///
    /// Driver-only. The lock is held just long enough to swap the buffer
    /// out; uids are assigned afterwards in buffered order. Returns the
    /// number of events moved.
    pub fn drain_into(&self, queue: &mut EventQueue, clock: &mut ClockState) -> usize {
        let drained = {
            let mut state = self.state.lock();
            if state.buffer.is_empty() {
                return 0;
            }
            std::mem::take(&mut state.buffer)
        };

        let count = drained.len();
        for event in drained {
            debug_assert!(event.timestamp >= clock.now());
            let key = EventKey::new(event.timestamp, clock.allocate_uid());
            trace!(uid = key.uid, at = %key.ts, context = %event.context, "drained cross-context event");
            queue.insert(key, event.context, event.action);
        }
        count
    }

    /// Raise the floor to `to` if nothing is buffered
    ///
    /// Returns `false` when events arrived since the last drain; the driver
    /// must drain again before committing to its next event.
    pub fn try_raise_floor(&self, to: SimTime) -> bool {
        let mut state = self.state.lock();
        if !state.buffer.is_empty() {
            return false;
        }
        if to > state.floor {
            state.floor = to;
        }
        true
    }

    /// Refuse further pushes and hand back whatever is still buffered
    pub fn close(&self) -> Vec<EventWithContext> {
        let mut state = self.state.lock();
        state.closed = true;
        state.buffer.drain(..).collect()
    }
}

/// Destroy-phase handles are told apart by their context, so no timeline
/// event may carry it.
pub(crate) fn check_timeline_context(context: ContextId) -> SimResult<()> {
    if context == ContextId::DESTROY {
        return Err(SimulatorError::ReservedContext(context));
    }
    Ok(())
}

/// Cloneable, thread-safe handle for scheduling into a simulator's inbox
///
/// This is the only way to reach a simulator from another thread.
///
/// # Example
/// ```
/// use cosim_simulator_core_rs::{ContextId, SimTime, Simulator};
///
/// let mut sim = Simulator::default();
/// let sender = sim.context_sender();
///
/// std::thread::spawn(move || {
///     sender
///         .schedule_at(ContextId::new(7), SimTime::new(5), |sim| {
///             assert_eq!(sim.context(), ContextId::new(7));
///         })
///         .unwrap();
/// })
/// .join()
/// .unwrap();
///
/// sim.run().unwrap();
/// assert_eq!(sim.now(), SimTime::new(5));
/// ```
#[derive(Debug, Clone)]
pub struct ContextSender {
    inbox: Arc<CrossContextInbox>,
}

impl ContextSender {
    pub(crate) fn new(inbox: Arc<CrossContextInbox>) -> Self {
        Self { inbox }
    }

    /// Schedule `action` at absolute time `at` in `context`
    pub fn schedule_at<F>(&self, context: ContextId, at: SimTime, action: F) -> SimResult<()>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        self.inbox.push(EventWithContext {
            context,
            timestamp: at,
            action: Box::new(action),
        })
    }

    /// Schedule `action` `delay` ticks after the driver's published time
    ///
    /// Returns the absolute timestamp the event was buffered for.
    pub fn schedule_with_context<F>(
        &self,
        context: ContextId,
        delay: u64,
        action: F,
    ) -> SimResult<SimTime>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        self.inbox.push_after(context, delay, Box::new(action))
    }

    /// Lower bound on the simulator's current time
    pub fn floor(&self) -> SimTime {
        self.inbox.floor()
    }

    /// Events buffered but not yet drained
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// True once the simulator has been destroyed
    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }
}
