//! Execution driver
//!
//! The driver loop is a small state machine:
//!
//! ```text
//! Idle ─► Draining ─► Advancing ─► Executing ─┐
//!            ▲            │                    │
//!            └────────────┼────────────────────┘
//!                         ▼
//!                      Stopped ─► Destroying ─► Destroyed
//! ```
//!
//! Every iteration drains the cross-context inbox before looking at the
//! queue head, so an injected event can never be starved behind an event
//! that was already chosen. `run()` stops on exhaustion or on a stop
//! request; `run_until(t)` additionally stops before the first event later
//! than `t`, leaving it queued for the next call.
//!
//! # Critical Invariants
//!
//! 1. Executed timestamps never decrease
//! 2. Only the thread holding `&mut Simulator` executes actions
//! 3. A failed schedule call leaves no trace in the queue or the inbox

use crate::core::clock::ClockState;
use crate::core::time::SimTime;
use crate::error::{SimResult, SimulatorError};
use crate::events::inbox::check_timeline_context;
use crate::events::{ContextSender, CrossContextInbox, DestroyList};
use crate::models::event::{ContextId, EventId, EventKey, EventWithContext};
use crate::orchestrator::checkpoint::{compute_config_hash, SimulatorSnapshot};
use crate::orchestrator::config::SimulatorConfig;
use crate::scheduler::{EventQueue, SchedulerKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Lifecycle state of the execution driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Constructed, never run
    Idle,
    /// Moving cross-context events into the queue
    Draining,
    /// Inspecting the queue head
    Advancing,
    /// Running an event's action
    Executing,
    /// Loop has returned to the caller
    Stopped,
    /// Running destroy-phase actions
    Destroying,
    /// Torn down; every operation but queries fails
    Destroyed,
}

impl RunState {
    /// True while the driver loop is on the stack
    pub fn is_running(self) -> bool {
        matches!(self, RunState::Draining | RunState::Advancing | RunState::Executing)
    }

    /// True from the start of teardown onwards
    pub fn is_torn_down(self) -> bool {
        matches!(self, RunState::Destroying | RunState::Destroyed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Draining => "draining",
            RunState::Advancing => "advancing",
            RunState::Executing => "executing",
            RunState::Stopped => "stopped",
            RunState::Destroying => "destroying",
            RunState::Destroyed => "destroyed",
        };
        write!(f, "{}", name)
    }
}

/// Single-process discrete-event simulator
///
/// # Example
///
/// ```rust
/// use cosim_simulator_core_rs::{SimTime, Simulator};
/// use std::sync::{Arc, Mutex};
///
/// let mut sim = Simulator::default();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// for delay in [30, 10, 20] {
///     let seen = seen.clone();
///     sim.schedule(delay, move |sim| seen.lock().unwrap().push(sim.now().ticks()))
///         .unwrap();
/// }
///
/// sim.run_until(SimTime::new(20)).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![10, 20]);
///
/// sim.run().unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30]);
/// assert!(sim.is_finished());
/// ```
pub struct Simulator {
    config: SimulatorConfig,
    instance_id: Uuid,
    queue: EventQueue,
    inbox: Arc<CrossContextInbox>,
    clock: ClockState,
    destroy_list: DestroyList,
    stop: bool,
    state: RunState,
}

impl Simulator {
    /// Create a simulator from a validated configuration
    pub fn new(config: SimulatorConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimulatorConfig) -> Self {
        let instance_id = Uuid::new_v4();
        debug!(%instance_id, scheduler = %config.scheduler, system_id = config.system_id, "simulator created");
        Self {
            queue: EventQueue::new(config.scheduler),
            inbox: Arc::new(CrossContextInbox::new()),
            clock: ClockState::new(config.main_context),
            destroy_list: DestroyList::new(),
            stop: false,
            state: RunState::Idle,
            instance_id,
            config,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Random id of this simulator instance
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn system_id(&self) -> u32 {
        self.config.system_id
    }

    /// Largest time an event may be scheduled at
    pub fn max_simulation_time(&self) -> SimTime {
        SimTime::MAX
    }

    pub fn scheduler_kind(&self) -> SchedulerKind {
        self.queue.kind()
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Context of the event currently (or most recently) executing
    pub fn context(&self) -> ContextId {
        self.clock.context()
    }

    /// Uid of the event currently (or most recently) executing
    pub fn current_uid(&self) -> u64 {
        self.clock.current_uid()
    }

    /// Events executed so far
    pub fn event_count(&self) -> u64 {
        self.clock.event_count()
    }

    /// Events inserted but not yet executed, counting the inbox
    ///
    /// Destroy-phase events are not included.
    pub fn pending_count(&self) -> usize {
        self.queue.len() + self.inbox.len()
    }

    /// True once the loop has stopped with nothing left to do
    ///
    /// A non-empty inbox means more work will appear at the next drain, so
    /// it counts as unfinished.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            RunState::Stopped | RunState::Destroying | RunState::Destroyed
        ) && self.queue.is_empty()
            && self.inbox.is_empty()
    }

    /// Earliest pending timestamp across queue and inbox
    ///
    /// Returns `SimTime::MAX` when nothing is pending. Lets an external
    /// driver decide how far it may advance before this simulator needs
    /// servicing.
    pub fn next(&self) -> SimTime {
        self.peek_next().unwrap_or(SimTime::MAX)
    }

    /// `next()` as a raw tick count
    pub fn next_timestamp(&self) -> u64 {
        self.next().ticks()
    }

    /// Earliest pending timestamp, or `EmptyQueue`
    pub fn peek_next(&self) -> SimResult<SimTime> {
        let queued = self.queue.peek_key().ok().map(|k| k.ts);
        let buffered = self.inbox.earliest();
        match (queued, buffered) {
            (Some(a), Some(b)) => Ok(a.min(b)),
            (Some(t), None) | (None, Some(t)) => Ok(t),
            (None, None) => Err(SimulatorError::EmptyQueue),
        }
    }

    /// True once `id` can no longer run: executed, cancelled or unknown
    pub fn is_expired(&self, id: &EventId) -> bool {
        if id.is_destroy() {
            !self.destroy_list.contains(id)
        } else {
            !self.queue.contains(id)
        }
    }

    /// Ticks until `id` fires; 0 once expired
    pub fn delay_left(&self, id: &EventId) -> u64 {
        if self.is_expired(id) {
            0
        } else {
            id.timestamp().saturating_since(self.now())
        }
    }

    /// Handle for scheduling from other threads
    pub fn context_sender(&self) -> ContextSender {
        ContextSender::new(Arc::clone(&self.inbox))
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Schedule `action` `delay` ticks from now, in the current context
    pub fn schedule<F>(&mut self, delay: u64, action: F) -> SimResult<EventId>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        self.ensure_live("schedule")?;
        let at = self.after(delay)?;
        Ok(self.insert(at, self.clock.context(), Box::new(action)))
    }

    /// Schedule `action` at absolute time `at`, in the current context
    ///
    /// Fails with `CausalityViolation` if `at` is before `now()`.
    pub fn schedule_at<F>(&mut self, at: SimTime, action: F) -> SimResult<EventId>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        self.ensure_live("schedule_at")?;
        if at < self.now() {
            return Err(SimulatorError::CausalityViolation {
                requested: at,
                current: self.now(),
            });
        }
        Ok(self.insert(at, self.clock.context(), Box::new(action)))
    }

    /// Schedule `action` at the current time, after every event already
    /// queued for it
    pub fn schedule_now<F>(&mut self, action: F) -> SimResult<EventId>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        self.ensure_live("schedule_now")?;
        Ok(self.insert(self.now(), self.clock.context(), Box::new(action)))
    }

    /// Schedule `action` in `context`, `delay` ticks from now
    ///
    /// The configured main context goes straight into the queue; any other
    /// context is routed through the cross-context inbox and receives its
    /// uid at the next drain. `ContextId::DESTROY` is rejected with
    /// `ReservedContext`.
    pub fn schedule_with_context<F>(&mut self, context: ContextId, delay: u64, action: F) -> SimResult<()>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        self.ensure_live("schedule_with_context")?;
        check_timeline_context(context)?;
        let at = self.after(delay)?;
        if context == self.config.main_context {
            self.insert(at, context, Box::new(action));
            return Ok(());
        }
        trace!(at = %at, %context, "buffered cross-context event");
        self.inbox.push(EventWithContext {
            context,
            timestamp: at,
            action: Box::new(action),
        })
    }

    /// Register `action` to run once at `destroy()`
    pub fn schedule_destroy<F>(&mut self, action: F) -> SimResult<EventId>
    where
        F: FnOnce(&mut Simulator) + Send + 'static,
    {
        self.ensure_live("schedule_destroy")?;
        let uid = self.clock.allocate_uid();
        self.destroy_list.push(uid, Box::new(action))
    }

    /// Remove a pending event so it never runs
    ///
    /// Fails with `NotFound` if the event already ran or was removed.
    pub fn remove(&mut self, id: &EventId) -> SimResult<()> {
        if id.is_destroy() {
            return self.destroy_list.remove(id);
        }
        self.queue.remove(id)?;
        trace!(uid = id.uid(), at = %id.timestamp(), "removed event");
        Ok(())
    }

    /// Cancel a pending event
    ///
    /// Cancellation is immediate: the event leaves the queue and its handle
    /// expires. Same semantics as [`remove`](Self::remove).
    pub fn cancel(&mut self, id: &EventId) -> SimResult<()> {
        self.remove(id)
    }

    /// Replace the queue's ordering backend, keeping every pending event
    pub fn set_scheduler(&mut self, kind: SchedulerKind) -> SimResult<()> {
        self.ensure_live("set_scheduler")?;
        if kind != self.queue.kind() {
            debug!(from = %self.queue.kind(), to = %kind, pending = self.queue.len(), "switching scheduler");
            self.queue.set_scheduler(kind);
            self.config.scheduler = kind;
        }
        Ok(())
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Request a halt after the current event
    pub fn stop(&mut self) {
        self.stop = true;
    }

    /// Schedule a halt `delay` ticks from now
    pub fn stop_after(&mut self, delay: u64) -> SimResult<EventId> {
        self.schedule(delay, |sim| sim.stop())
    }

    /// Run until the queue is exhausted or `stop()` is called
    ///
    /// Clears a stop request left over from a previous run.
    pub fn run(&mut self) -> SimResult<()> {
        self.ensure_runnable("run")?;
        self.stop = false;
        self.drive(None);
        Ok(())
    }

    /// Run every event with timestamp `<= checkpoint`
    ///
    /// The bound is inclusive. Later events stay queued for a subsequent
    /// call, and the stop flag is neither cleared nor set, so successive
    /// calls with increasing checkpoints resume seamlessly.
    pub fn run_until(&mut self, checkpoint: SimTime) -> SimResult<()> {
        self.ensure_runnable("run_until")?;
        self.drive(Some(checkpoint));
        Ok(())
    }

    /// Tear down: run destroy actions, discard everything still pending
    ///
    /// Inbox events that were never drained are dropped here, and the
    /// inbox refuses further pushes.
    pub fn destroy(&mut self) -> SimResult<()> {
        if self.state.is_running() || self.state.is_torn_down() {
            return Err(SimulatorError::InvalidState {
                operation: "destroy",
                state: self.state,
            });
        }

        self.state = RunState::Destroying;
        let actions = self.destroy_list.begin_drain();
        debug!(instance_id = %self.instance_id, destroy_events = actions.len(), "destroying simulator");
        for action in actions {
            action(self);
        }

        let discarded = self.inbox.close();
        if !discarded.is_empty() {
            warn!(count = discarded.len(), "discarding undrained cross-context events at teardown");
        }
        let dropped = self.queue.drain_ordered();
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "dropping pending events at teardown");
        }

        self.state = RunState::Destroyed;
        Ok(())
    }

    /// Serializable view of the current state
    pub fn snapshot(&self) -> SimResult<SimulatorSnapshot> {
        Ok(SimulatorSnapshot {
            instance_id: self.instance_id,
            system_id: self.config.system_id,
            state: self.state,
            now: self.now(),
            context: self.context(),
            event_count: self.event_count(),
            queued_events: self.queue.len(),
            inbox_events: self.inbox.len(),
            destroy_events: self.destroy_list.len(),
            next_timestamp: self.next(),
            scheduler: self.queue.kind(),
            config_hash: compute_config_hash(&self.config)?,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// The main loop shared by `run` and `run_until`
    fn drive(&mut self, checkpoint: Option<SimTime>) {
        debug!(now = %self.now(), checkpoint = ?checkpoint, pending = self.pending_count(), "driver loop start");

        loop {
            self.state = RunState::Draining;
            self.inbox.drain_into(&mut self.queue, &mut self.clock);

            self.state = RunState::Advancing;
            if self.stop {
                break;
            }
            let Ok(head) = self.queue.peek_key() else {
                break;
            };
            if checkpoint.is_some_and(|limit| head.ts > limit) {
                break;
            }
            // Commit to `head` only if nothing slipped into the inbox since
            // the drain; otherwise drain again.
            if !self.inbox.try_raise_floor(head.ts) {
                continue;
            }
            let Ok(event) = self.queue.pop_min() else {
                break;
            };

            self.clock.advance(event.key, event.context);
            self.state = RunState::Executing;
            trace!(uid = event.key.uid, at = %event.key.ts, context = %event.context, "executing event");
            (event.action)(self);
        }

        self.state = RunState::Stopped;
        debug!(now = %self.now(), events = self.event_count(), pending = self.pending_count(), stop = self.stop, "driver loop stopped");
    }

    fn insert(&mut self, at: SimTime, context: ContextId, action: crate::models::event::Action) -> EventId {
        let key = EventKey::new(at, self.clock.allocate_uid());
        trace!(uid = key.uid, at = %at, %context, "scheduled event");
        self.queue.insert(key, context, action)
    }

    fn after(&self, delay: u64) -> SimResult<SimTime> {
        self.now()
            .checked_add(delay)
            .ok_or(SimulatorError::TimeOverflow {
                base: self.now(),
                delay,
            })
    }

    fn ensure_live(&self, operation: &'static str) -> SimResult<()> {
        if self.state.is_torn_down() {
            return Err(SimulatorError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn ensure_runnable(&self, operation: &'static str) -> SimResult<()> {
        if self.state.is_running() || self.state.is_torn_down() {
            return Err(SimulatorError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::build(SimulatorConfig::default())
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        // Producers holding a ContextSender must see the simulator as gone.
        self.inbox.close();
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("instance_id", &self.instance_id)
            .field("state", &self.state)
            .field("clock", &self.clock)
            .field("queue", &self.queue)
            .field("destroy_list", &self.destroy_list)
            .field("stop", &self.stop)
            .finish()
    }
}
