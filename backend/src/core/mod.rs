//! Core time primitives
//!
//! - **time**: the simulated timestamp type
//! - **clock**: the clock/context state advanced by the execution driver

pub mod clock;
pub mod time;
