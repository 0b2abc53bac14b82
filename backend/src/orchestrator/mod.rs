//! Orchestrator - the execution driver
//!
//! Owns the event queue, the clock, the cross-context inbox and the destroy
//! list, and exposes the control surface used by event producers and by an
//! external co-simulation orchestrator.
//!
//! See `engine.rs` for the main loop.

pub mod checkpoint;
pub mod config;
pub mod engine;

pub use checkpoint::{compute_config_hash, SimulatorSnapshot};
pub use config::SimulatorConfig;
pub use engine::{RunState, Simulator};
