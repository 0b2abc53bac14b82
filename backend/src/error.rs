//! Error taxonomy for the simulation core
//!
//! Every fallible public operation returns [`SimResult`]. Errors are local
//! and synchronous: a failed call leaves the queue, the inbox and the clock
//! exactly as they were before the call.

use crate::core::time::SimTime;
use crate::models::event::{ContextId, EventId};
use crate::orchestrator::RunState;
use thiserror::Error;

/// Errors raised by the simulator, its event queue and its inbox
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulatorError {
    /// An event was scheduled strictly before the current simulated time
    #[error("causality violation: cannot schedule event at {requested} when current time is {current}")]
    CausalityViolation { requested: SimTime, current: SimTime },

    /// The id does not name a pending event (already executed, cancelled or unknown)
    #[error("event {0} not found (expired or never scheduled)")]
    NotFound(EventId),

    /// Peek on a simulator with nothing pending
    #[error("no pending events")]
    EmptyQueue,

    /// Operation not permitted in the simulator's current lifecycle state
    #[error("invalid state for {operation}: simulator is {state}")]
    InvalidState {
        operation: &'static str,
        state: RunState,
    },

    /// A timeline event was tagged with the reserved destroy-phase context
    #[error("context {0} is reserved for destroy-phase events")]
    ReservedContext(ContextId),

    /// `now + delay` does not fit in the time representation
    #[error("time overflow: {base} + {delay} ticks")]
    TimeOverflow { base: SimTime, delay: u64 },

    /// Configuration validation error
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Config or snapshot (de)serialization failed
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Convenience alias for `Result<T, SimulatorError>`
pub type SimResult<T> = Result<T, SimulatorError>;
