//! Co-Simulation Simulator Core - Rust Engine
//!
//! Single-process discrete-event scheduler built to be stepped by an
//! external co-simulation orchestrator.
//!
//! # Architecture
//!
//! - **core**: Simulated time and the clock/context state
//! - **models**: Events, handles and contexts
//! - **scheduler**: Arena-backed event queue with pluggable ordering index
//! - **events**: Cross-context inbox and destroy-phase list
//! - **orchestrator**: Execution driver, config and snapshots
//!
//! # Critical Invariants
//!
//! 1. Simulated time never decreases
//! 2. Equal timestamps run in queue-insertion order
//! 3. Only the driver thread executes events; other threads reach the
//!    simulator exclusively through a [`ContextSender`]

// Module declarations
pub mod core;
pub mod error;
pub mod events;
pub mod models;
pub mod orchestrator;
pub mod scheduler;

// Re-exports for convenience
pub use crate::core::time::SimTime;
pub use error::{SimResult, SimulatorError};
pub use events::ContextSender;
pub use models::event::{Action, ContextId, EventId, EventKey};
pub use orchestrator::{RunState, Simulator, SimulatorConfig, SimulatorSnapshot};
pub use scheduler::SchedulerKind;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn cosim_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::simulator::PySimulator>()?;
    m.add_class::<ffi::simulator::PyContextSender>()?;
    m.add_class::<ffi::simulator::PyEventId>()?;
    Ok(())
}
