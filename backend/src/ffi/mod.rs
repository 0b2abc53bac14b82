//! Python bindings (PyO3)
//!
//! Exposes the simulator to a Python co-simulation orchestrator that steps
//! it with `run_until` and injects Python callables as events.

pub mod simulator;
pub mod types;
